//! Cutoff functions, weighting the contribution of each neighbor depending on
//! its distance to the central atom.
use ndarray::{Array, ArrayView, Dimension};

use crate::Error;

/// Definition of the local environment of an atom
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Cutoff {
    /// Radius of the spherical cutoff to use for atomic environments
    pub radius: f64,
    /// Cutoff function used to smooth the behavior around the cutoff radius
    pub smoothing: Smoothing,
}

/// Possible values for the smoothing cutoff function
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Deserialize, serde::Serialize, schemars::JsonSchema)]
#[serde(deny_unknown_fields)]
#[serde(tag = "type")]
pub enum Smoothing {
    /// Step smoothing function (i.e. no smoothing). This is 1 inside the cutoff
    /// and 0 outside, with a sharp step at the boundary.
    Step,
    /// Cosine smoothing function over the whole cutoff sphere
    /// `f(r) = 1/2 * (1 + cos(π r / cutoff))`
    Cosine,
    /// Shifted cosine smoothing function
    /// `f(r) = 1/2 * (1 + cos(π (r - cutoff + width) / width ))`
    ShiftedCosine {
        /// Width of the switching function
        width: f64,
    },
    /// Mollifier smoothing function
    /// `f(r) = exp(1 - 1 / (1 - (r / cutoff)^2))`, which is infinitely
    /// differentiable everywhere.
    Mollifier {
        /// The function is set to zero for `r + eps >= cutoff`, avoiding the
        /// division by zero at the boundary
        eps: f64,
    },
}

impl Cutoff {
    /// Create a new hard cutoff of the given `radius`
    pub fn step(radius: f64) -> Cutoff {
        Cutoff { radius, smoothing: Smoothing::Step }
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.radius <= 0.0 || !self.radius.is_finite() {
            return Err(Error::Configuration(format!(
                "expected positive cutoff radius, got {}", self.radius
            )));
        }

        match self.smoothing {
            Smoothing::Step | Smoothing::Cosine => {},
            Smoothing::ShiftedCosine { width } => {
                if width <= 0.0 || !width.is_finite() {
                    return Err(Error::Configuration(format!(
                        "expected positive width for shifted cosine cutoff function, got {}",
                        width
                    )));
                }

                if width > self.radius {
                    return Err(Error::Configuration(format!(
                        "shifted cosine width ({}) can not be larger than the cutoff radius ({})",
                        width, self.radius
                    )));
                }
            }
            Smoothing::Mollifier { eps } => {
                if eps < 0.0 || !eps.is_finite() {
                    return Err(Error::Configuration(format!(
                        "expected positive eps for mollifier cutoff function, got {}",
                        eps
                    )));
                }
            }
        }
        return Ok(());
    }

    /// Evaluate the cutoff function at the distance `r`
    #[inline]
    pub fn weight(&self, r: f64) -> f64 {
        match self.smoothing {
            Smoothing::Step => {
                if r >= self.radius { 0.0 } else { 1.0 }
            },
            Smoothing::Cosine => {
                if r >= self.radius {
                    0.0
                } else {
                    let s = std::f64::consts::PI * r / self.radius;
                    0.5 * (1. + f64::cos(s))
                }
            },
            Smoothing::ShiftedCosine { width } => {
                if r <= (self.radius - width) {
                    1.0
                } else if r >= self.radius {
                    0.0
                } else {
                    let s = std::f64::consts::PI * (r - self.radius + width) / width;
                    0.5 * (1. + f64::cos(s))
                }
            }
            Smoothing::Mollifier { eps } => {
                if r + eps >= self.radius {
                    0.0
                } else {
                    let x = r / self.radius;
                    f64::exp(1.0 - 1.0 / (1.0 - x * x))
                }
            }
        }
    }

    /// Evaluate the cutoff function for all the distances in `distances`
    pub fn weights<D: Dimension>(&self, distances: ArrayView<'_, f64, D>) -> Array<f64, D> {
        distances.mapv(|r| self.weight(r))
    }
}


#[cfg(test)]
mod tests {
    use ndarray::array;
    use super::*;

    #[test]
    fn step() {
        let cutoff = Cutoff::step(4.0);

        assert_eq!(cutoff.weight(0.0), 1.0);
        assert_eq!(cutoff.weight(2.0), 1.0);
        assert_eq!(cutoff.weight(3.999), 1.0);
        assert_eq!(cutoff.weight(4.0), 0.0);
        assert_eq!(cutoff.weight(5.0), 0.0);
    }

    #[test]
    fn cosine() {
        let cutoff = Cutoff { radius: 4.0, smoothing: Smoothing::Cosine };

        assert_eq!(cutoff.weight(0.0), 1.0);
        approx::assert_ulps_eq!(cutoff.weight(2.0), 0.5);
        assert_eq!(cutoff.weight(4.0), 0.0);
        assert_eq!(cutoff.weight(5.0), 0.0);
    }

    #[test]
    fn shifted_cosine() {
        let cutoff = Cutoff { radius: 4.0, smoothing: Smoothing::ShiftedCosine { width: 0.5 }};

        assert_eq!(cutoff.weight(2.0), 1.0);
        assert_eq!(cutoff.weight(3.5), 1.0);
        assert_eq!(cutoff.weight(3.8), 0.34549150281252683);
        assert_eq!(cutoff.weight(4.0), 0.0);
        assert_eq!(cutoff.weight(5.0), 0.0);
    }

    #[test]
    fn mollifier() {
        let cutoff = Cutoff { radius: 4.0, smoothing: Smoothing::Mollifier { eps: 1e-7 }};

        assert_eq!(cutoff.weight(0.0), 1.0);
        assert!(cutoff.weight(3.9) > 0.0);
        assert!(cutoff.weight(3.9) < 1e-3);
        assert_eq!(cutoff.weight(4.0), 0.0);
        assert_eq!(cutoff.weight(1e6), 0.0);
    }

    #[test]
    fn smooth_functions_are_monotonic() {
        let smoothings = [
            Smoothing::Cosine,
            Smoothing::ShiftedCosine { width: 1.5 },
            Smoothing::Mollifier { eps: 0.0 },
        ];

        for smoothing in smoothings {
            let cutoff = Cutoff { radius: 3.0, smoothing };
            let mut previous = cutoff.weight(0.0);
            assert_eq!(previous, 1.0);

            for i in 1..=400 {
                let r = 0.01 * i as f64;
                let current = cutoff.weight(r);
                assert!(current <= previous, "{:?} is increasing at r={}", smoothing, r);
                assert!((0.0..=1.0).contains(&current));
                // no jumps larger than what a smooth function could do
                assert!(previous - current < 0.05, "{:?} is not continuous at r={}", smoothing, r);
                previous = current;
            }
            assert_eq!(cutoff.weight(3.0), 0.0);
        }
    }

    #[test]
    fn weights() {
        let cutoff = Cutoff::step(2.0);
        let distances = array![[[0.5, 1.9], [2.0, 3.5]]];
        assert_eq!(cutoff.weights(distances.view()), array![[[1.0, 1.0], [0.0, 0.0]]]);
    }

    #[test]
    fn validate() {
        assert!(Cutoff::step(3.0).validate().is_ok());

        let error = Cutoff::step(0.0).validate().unwrap_err();
        assert_eq!(error.to_string(), "invalid configuration: expected positive cutoff radius, got 0");

        assert!(Cutoff::step(f64::NAN).validate().is_err());
        assert!(Cutoff::step(-2.0).validate().is_err());

        let cutoff = Cutoff { radius: 3.0, smoothing: Smoothing::ShiftedCosine { width: -0.5 } };
        assert!(matches!(cutoff.validate(), Err(Error::Configuration(_))));

        let cutoff = Cutoff { radius: 3.0, smoothing: Smoothing::ShiftedCosine { width: 3.5 } };
        assert!(matches!(cutoff.validate(), Err(Error::Configuration(_))));

        let cutoff = Cutoff { radius: 3.0, smoothing: Smoothing::Mollifier { eps: -1.0 } };
        assert!(matches!(cutoff.validate(), Err(Error::Configuration(_))));
    }

    #[test]
    fn json() {
        let cutoff: Cutoff = serde_json::from_str(r#"{
            "radius": 5.0,
            "smoothing": {"type": "ShiftedCosine", "width": 0.5}
        }"#).unwrap();
        assert_eq!(cutoff, Cutoff { radius: 5.0, smoothing: Smoothing::ShiftedCosine { width: 0.5 } });

        let cutoff: Cutoff = serde_json::from_str(r#"{"radius": 5.0, "smoothing": {"type": "Step"}}"#).unwrap();
        assert_eq!(cutoff, Cutoff::step(5.0));
    }
}
