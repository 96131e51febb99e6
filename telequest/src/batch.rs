use crate::error::{Result, TelequestError};

/// Split `items` into consecutive chunks of `size`; only the last chunk may be shorter.
pub fn split<T: Clone>(items: &[T], size: usize) -> Result<Vec<Vec<T>>> {
    if size == 0 {
        return Err(TelequestError::InvalidInput(
            "batch size must be positive".to_string(),
        ));
    }

    Ok(items.chunks(size).map(<[T]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_uneven() {
        let items: Vec<u32> = (1..=250).collect();
        let batches = split(&items, 100).unwrap();

        let lengths: Vec<usize> = batches.iter().map(Vec::len).collect();
        assert_eq!(lengths, vec![100, 100, 50]);
        assert_eq!(batches.concat(), items);
    }

    #[test]
    fn test_split_exact_multiple() {
        let items: Vec<u32> = (0..200).collect();
        let batches = split(&items, 100).unwrap();
        assert_eq!(batches.len(), 2);
        assert!(batches.iter().all(|batch| batch.len() == 100));
    }

    #[test]
    fn test_split_smaller_than_size() {
        let batches = split(&["a", "b"], 100).unwrap();
        assert_eq!(batches, vec![vec!["a", "b"]]);
    }

    #[test]
    fn test_split_empty_input() {
        let batches = split::<u8>(&[], 3).unwrap();
        assert!(batches.is_empty());
    }

    #[test]
    fn test_split_rejects_zero_size() {
        let result = split(&[1, 2, 3], 0);
        assert!(matches!(result, Err(TelequestError::InvalidInput(_))));
    }
}
