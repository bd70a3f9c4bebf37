/// Non-linear activation functions applied after dense layers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Softplus shifted to go through the origin,
    /// `ssp(x) = ln(1 + e^x) - ln(2)`
    ShiftedSoftplus,
}

impl Activation {
    /// Evaluate this activation function at `x`
    #[inline]
    pub fn compute(self, x: f64) -> f64 {
        match self {
            Activation::ShiftedSoftplus => shifted_softplus(x),
        }
    }
}

/// `ln(1 + e^x) - ln(2)`, written so that it does not overflow for large
/// positive `x`.
#[inline]
pub fn shifted_softplus(x: f64) -> f64 {
    f64::max(x, 0.0) + f64::ln_1p(f64::exp(-f64::abs(x))) - std::f64::consts::LN_2
}
