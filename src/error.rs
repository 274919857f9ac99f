use thiserror::Error;

/// Fatal pipeline failures. Everything else is resolved by skip/default policy
/// inside the stages and never surfaces here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("document nesting exceeds the depth limit of {limit}")]
    DepthExceeded { limit: usize },
}

impl From<std::str::Utf8Error> for PipelineError {
    fn from(e: std::str::Utf8Error) -> Self {
        PipelineError::Parse(format!("source is not valid UTF-8 ({})", e))
    }
}

/// Fail with `DepthExceeded` once `depth` passes `limit`.
pub fn guard_depth(depth: usize, limit: usize) -> Result<(), PipelineError> {
    if depth > limit {
        Err(PipelineError::DepthExceeded { limit })
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guard_allows_up_to_limit() {
        assert!(guard_depth(0, 0).is_ok());
        assert!(guard_depth(10, 10).is_ok());
        assert_eq!(guard_depth(11, 10), Err(PipelineError::DepthExceeded { limit: 10 }));
    }

    #[test]
    fn utf8_failure_is_parse_error() {
        let bytes = [0x66, 0x6f, 0xff];
        let err: PipelineError = std::str::from_utf8(&bytes).unwrap_err().into();
        assert!(matches!(err, PipelineError::Parse(msg) if msg.contains("UTF-8")));
    }
}
