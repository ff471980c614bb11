use std::fmt;

/// Errors raised by operations on spectral vectors
#[derive(Debug, Clone, PartialEq)]
pub enum SpectralError {
    /// Two operands had different lengths
    DimensionMismatch { left: usize, right: usize },
    /// A basis index was outside the vector
    IndexOutOfRange { index: usize, len: usize },
}

impl fmt::Display for SpectralError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpectralError::DimensionMismatch { left, right } => {
                write!(f, "dimension mismatch: {left} vs {right}")
            }
            SpectralError::IndexOutOfRange { index, len } => {
                write!(f, "basis index {index} out of range for length {len}")
            }
        }
    }
}

impl std::error::Error for SpectralError {}

/// Errors related to invalid model or sweep configuration
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    InflowCountMismatch {
        masses: usize,
        decay_rates: usize,
    },
    NonFinite {
        name: &'static str,
        value: f64,
    },
    Negative {
        name: &'static str,
        value: f64,
    },
    OutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// A non-constant basis frequency evaluated to zero
    ZeroFrequency {
        basis: String,
    },
    /// An inflow decay rate sits on a root of the characteristic polynomial
    DegenerateInflow {
        index: usize,
        decay_rate: f64,
    },
    /// The aggregate rate `q` must be strictly positive
    NonPositiveAggregate {
        q: f64,
    },
    /// Degeneracy breaking failed to separate two basis frequencies
    UnresolvedDegeneracy {
        first: String,
        second: String,
    },
    InvalidAxis {
        name: String,
        reason: &'static str,
    },
    InvalidDistribution {
        name: &'static str,
        reason: &'static str,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InflowCountMismatch {
                masses,
                decay_rates,
            } => write!(
                f,
                "inflow count mismatch: {masses} masses but {decay_rates} decay rates"
            ),
            ConfigError::NonFinite { name, value } => {
                write!(f, "parameter {name} is not finite ({value})")
            }
            ConfigError::Negative { name, value } => {
                write!(f, "parameter {name} must be non-negative (got {value})")
            }
            ConfigError::OutOfRange {
                name,
                value,
                min,
                max,
            } => write!(
                f,
                "parameter {name}={value} outside allowed range [{min}, {max}]"
            ),
            ConfigError::ZeroFrequency { basis } => {
                write!(f, "basis frequency '{basis}' must be nonzero")
            }
            ConfigError::DegenerateInflow { index, decay_rate } => write!(
                f,
                "inflow {index} decay rate {decay_rate} coincides with a characteristic root"
            ),
            ConfigError::NonPositiveAggregate { q } => {
                write!(f, "aggregate rate q={q} must be positive")
            }
            ConfigError::UnresolvedDegeneracy { first, second } => write!(
                f,
                "could not separate basis frequencies '{first}' and '{second}'"
            ),
            ConfigError::InvalidAxis { name, reason } => {
                write!(f, "invalid sweep axis {name}: {reason}")
            }
            ConfigError::InvalidDistribution { name, reason } => {
                write!(f, "invalid distribution for {name}: {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Errors raised while building or evaluating an annulus model
#[derive(Debug, Clone, PartialEq)]
pub enum ModelError {
    Config(ConfigError),
    Spectral(SpectralError),
}

impl fmt::Display for ModelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelError::Config(e) => write!(f, "{e}"),
            ModelError::Spectral(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ModelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ModelError::Config(e) => Some(e),
            ModelError::Spectral(e) => Some(e),
        }
    }
}

impl From<ConfigError> for ModelError {
    fn from(err: ConfigError) -> Self {
        ModelError::Config(err)
    }
}

impl From<SpectralError> for ModelError {
    fn from(err: SpectralError) -> Self {
        ModelError::Spectral(err)
    }
}

/// Errors raised while running a parameter sweep
#[derive(Debug)]
pub enum SweepError {
    Config(ConfigError),
    Spectral(SpectralError),
    /// Two grids with different shapes were folded together
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },
    InvalidPoolSize,
    ThreadPool(String),
    /// A worker stopped without reporting its local grid
    WorkerLost { slot: usize },
}

impl fmt::Display for SweepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepError::Config(e) => write!(f, "{e}"),
            SweepError::Spectral(e) => write!(f, "{e}"),
            SweepError::ShapeMismatch { expected, found } => write!(
                f,
                "grid shape mismatch: expected {}x{}, found {}x{}",
                expected.0, expected.1, found.0, found.1
            ),
            SweepError::InvalidPoolSize => write!(f, "worker pool size must be at least 1"),
            SweepError::ThreadPool(msg) => write!(f, "failed to build worker pool: {msg}"),
            SweepError::WorkerLost { slot } => {
                write!(f, "worker in slot {slot} exited without reporting")
            }
        }
    }
}

impl std::error::Error for SweepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SweepError::Config(e) => Some(e),
            SweepError::Spectral(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for SweepError {
    fn from(err: ConfigError) -> Self {
        SweepError::Config(err)
    }
}

impl From<SpectralError> for SweepError {
    fn from(err: SpectralError) -> Self {
        SweepError::Spectral(err)
    }
}

pub type Result<T> = std::result::Result<T, SpectralError>;
