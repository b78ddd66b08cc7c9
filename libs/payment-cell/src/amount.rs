use crate::models::PaymentError;

/// Chooses the amount to charge: the override when given, else the doctor's
/// consultation fee. Anything not positive falls back to `floor`. The result
/// is rounded to cents.
pub fn resolve_amount(
    amount_override: Option<f64>,
    consultation_fee: Option<f64>,
    floor: f64,
) -> Result<f64, PaymentError> {
    if let Some(requested) = amount_override {
        if !requested.is_finite() {
            return Err(PaymentError::GatewayAmountInvalid(requested.to_string()));
        }
    }

    let amount = amount_override
        .or(consultation_fee)
        .filter(|amount| amount.is_finite() && *amount > 0.0)
        .unwrap_or(floor);

    Ok((amount * 100.0).round() / 100.0)
}
