use crate::error::FabricationError;

/// One intermediate state of the target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    /// Position in the sequence, starting at 0.
    pub index: usize,
    /// Full file content after this snapshot is applied.
    pub content: String,
    /// Byte offset in the final content where this snapshot's delta starts.
    pub delta_start: usize,
}

impl Snapshot {
    /// The slice this snapshot adds on top of the previous one.
    pub fn delta(&self) -> &str {
        &self.content[self.delta_start..]
    }
}

/// Splits `content` into lines, keeping each line terminator with its line.
///
/// Concatenating the returned units gives back `content` unchanged. A final
/// line without a trailing newline is still a unit.
pub fn units(content: &str) -> Vec<&str> {
    content.split_inclusive('\n').collect()
}

/// Number of atomic units `content` can be segmented into.
pub fn unit_count(content: &str) -> usize {
    units(content).len()
}

/// Produces up to `n` snapshots that grow toward `content`.
///
/// `n` is clamped to the number of lines. Lines are grouped contiguously;
/// group sizes differ by at most one, with the larger groups first. The
/// result is deterministic for a given `(content, n)`.
///
/// # Parameters
/// - `content`: The final file content.
/// - `n`: Requested number of snapshots.
///
/// # Returns
/// Snapshots in order; the last one equals `content`.
///
/// # Examples
///
/// ```
/// use git_rockstar::segment::segment;
///
/// let snaps = segment("a\nb\nc\n", 2).unwrap();
/// assert_eq!(snaps[0].content, "a\nb\n");
/// assert_eq!(snaps[1].delta(), "c\n");
/// ```
///
/// # Errors
///
/// * [`FabricationError::Configuration`] if `content` is empty.
/// * [`FabricationError::DegenerateInput`] if `n` is zero.
pub fn segment(content: &str, n: usize) -> Result<Vec<Snapshot>, FabricationError> {
    if content.is_empty() {
        return Err(FabricationError::Configuration(String::from(
            "file content is empty",
        )));
    }
    if n == 0 {
        return Err(FabricationError::DegenerateInput(String::from(
            "at least one snapshot is required",
        )));
    }

    let lines = units(content);
    let count = n.min(lines.len());
    let base = lines.len() / count;
    let extra = lines.len() % count;

    let mut snapshots = Vec::with_capacity(count);
    let mut consumed = 0usize;
    let mut offset = 0usize;
    for index in 0..count {
        let size = base + usize::from(index < extra);
        let start = offset;
        offset += lines[consumed..consumed + size]
            .iter()
            .map(|l| l.len())
            .sum::<usize>();
        consumed += size;
        snapshots.push(Snapshot {
            index,
            content: content[..offset].to_string(),
            delta_start: start,
        });
    }

    Ok(snapshots)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_lines() -> String {
        (1..=10).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn deltas_concatenate_to_content() {
        let content = "a\nbb\n\nccc\r\nno newline";
        for n in 1..=7 {
            let snaps = segment(content, n).expect("segment");
            let joined: String = snaps.iter().map(|s| s.delta()).collect();
            assert_eq!(joined, content);
        }
    }

    #[test]
    fn last_snapshot_is_full_content_and_first_is_non_empty() {
        let content = ten_lines();
        let snaps = segment(&content, 4).expect("segment");
        assert_eq!(snaps.len(), 4);
        assert!(!snaps[0].content.is_empty());
        assert_eq!(snaps[3].content, content);
    }

    #[test]
    fn snapshots_are_growing_prefixes() {
        let content = ten_lines();
        let snaps = segment(&content, 10).expect("segment");
        for w in snaps.windows(2) {
            assert!(w[1].content.starts_with(&w[0].content));
            assert!(w[1].content.len() > w[0].content.len());
        }
    }

    #[test]
    fn group_sizes_differ_by_at_most_one() {
        let content = ten_lines();
        let snaps = segment(&content, 3).expect("segment");
        let sizes: Vec<usize> = snaps.iter().map(|s| unit_count(s.delta())).collect();
        assert_eq!(sizes, vec![4, 3, 3]);
    }

    #[test]
    fn n_is_clamped_to_line_count() {
        let snaps = segment("one\ntwo\n", 50).expect("segment");
        assert_eq!(snaps.len(), 2);
    }

    #[test]
    fn empty_content_is_rejected() {
        let r = segment("", 3);
        assert!(matches!(r, Err(FabricationError::Configuration(_))));
    }

    #[test]
    fn zero_snapshots_is_degenerate() {
        let r = segment("x\n", 0);
        assert!(matches!(r, Err(FabricationError::DegenerateInput(_))));
    }

    #[test]
    fn segmenting_is_deterministic() {
        let content = ten_lines();
        assert_eq!(segment(&content, 6), segment(&content, 6));
    }
}
