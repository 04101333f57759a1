//! Block-height formatting helpers.

use vigil_types::BlockNumber;

/// Blocks from `now` until `target`, zero once it is reached.
pub fn blocks_until(now: BlockNumber, target: BlockNumber) -> u64 {
    target.as_u64().saturating_sub(now.as_u64())
}

/// A block count with its approximate wall-clock length, e.g.
/// `"12 blocks (~2m 24s)"`.
pub fn format_blocks(blocks: u64, secs_per_block: u64) -> String {
    let noun = if blocks == 1 { "block" } else { "blocks" };
    if secs_per_block == 0 {
        return format!("{blocks} {noun}");
    }
    let secs = blocks.saturating_mul(secs_per_block);
    format!("{blocks} {noun} (~{})", format_duration(secs))
}

fn format_duration(secs: u64) -> String {
    if secs < 60 {
        format!("{secs}s")
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs < 86400 {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    } else {
        format!("{}d {}h", secs / 86400, (secs % 86400) / 3600)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_until_saturates() {
        assert_eq!(blocks_until(BlockNumber::new(10), BlockNumber::new(25)), 15);
        assert_eq!(blocks_until(BlockNumber::new(30), BlockNumber::new(25)), 0);
    }

    #[test]
    fn formatting() {
        assert_eq!(format_blocks(1, 0), "1 block");
        assert_eq!(format_blocks(12, 12), "12 blocks (~2m 24s)");
        assert_eq!(format_blocks(45_818, 12), "45818 blocks (~6d 8h)");
        assert_eq!(format_blocks(3, 4), "3 blocks (~12s)");
    }
}
