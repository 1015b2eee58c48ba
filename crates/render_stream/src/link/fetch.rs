//! Two-call size-then-fill helper

use super::LinkError;

/// Fill attempts made before giving up on a growing result
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Run a two-call link query to completion
///
/// `query(None)` must report the required element count and `query(Some(buf))`
/// must fill `buf` and report the count written. If the result grows between
/// the two calls the fill reports [`LinkError::BufferTooSmall`]; the buffer is
/// then resized and the fill retried, up to `max_attempts` fills in total.
///
/// # Arguments
/// * `what` - Name of the queried data, used in diagnostics
/// * `max_attempts` - Upper bound on fill calls (at least one is made)
/// * `query` - The link call, partially applied to everything but the buffer
pub fn fetch_sized<T, Q>(what: &str, max_attempts: u32, mut query: Q) -> Result<Vec<T>, LinkError>
where
    T: Clone + Default,
    Q: FnMut(Option<&mut [T]>) -> Result<usize, LinkError>,
{
    let mut required = match query(None) {
        Ok(required) | Err(LinkError::BufferTooSmall { required }) => required,
        Err(err) => return Err(err),
    };

    for attempt in 1..=max_attempts.max(1) {
        let mut buffer = vec![T::default(); required];
        match query(Some(&mut buffer)) {
            Ok(written) => {
                buffer.truncate(written);
                return Ok(buffer);
            }
            Err(LinkError::BufferTooSmall { required: grown }) => {
                log::debug!("{what} grew to {grown} elements during fetch (attempt {attempt})");
                required = grown;
            }
            Err(err) => return Err(err),
        }
    }

    log::warn!("Giving up fetching {what} after {max_attempts} attempts");
    Err(LinkError::BufferTooSmall { required })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Query over `data` whose fill fails `growth` times before succeeding
    fn growing_query(data: Vec<u32>, mut growth: usize) -> impl FnMut(Option<&mut [u32]>) -> Result<usize, LinkError> {
        move |out| {
            let Some(out) = out else {
                return Ok(data.len() - growth.min(data.len()));
            };
            if growth > 0 {
                growth -= 1;
                return Err(LinkError::BufferTooSmall {
                    required: data.len() - growth,
                });
            }
            if out.len() < data.len() {
                return Err(LinkError::BufferTooSmall { required: data.len() });
            }
            out[..data.len()].copy_from_slice(&data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_fetch_without_growth() {
        let values = fetch_sized("values", 3, growing_query(vec![1, 2, 3], 0)).unwrap();
        assert_eq!(values, vec![1, 2, 3]);
    }

    #[test]
    fn test_fetch_recovers_from_growth() {
        let values = fetch_sized("values", 3, growing_query(vec![4, 5, 6, 7], 2)).unwrap();
        assert_eq!(values, vec![4, 5, 6, 7]);
    }

    #[test]
    fn test_fetch_gives_up_after_max_attempts() {
        let result = fetch_sized("values", 3, growing_query(vec![1, 2, 3, 4, 5], 3));
        assert!(matches!(result, Err(LinkError::BufferTooSmall { .. })));
    }

    #[test]
    fn test_fetch_propagates_other_errors() {
        let result = fetch_sized::<u32, _>("values", 3, |_| Err(LinkError::NotFound));
        assert_eq!(result, Err(LinkError::NotFound));
    }

    #[test]
    fn test_fetch_empty_result() {
        let values = fetch_sized("values", 3, growing_query(Vec::new(), 0)).unwrap();
        assert!(values.is_empty());
    }
}
