//------------ Types for Statistics -----------------------------------------

use std::fmt::{Debug, Display};

use serde_derive::Serialize;

//------------ LevelStats ----------------------------------------------------

/// Subtable turnover for one trie level.
#[derive(Copy, Clone, Default, Serialize)]
pub struct LevelStats {
    pub level: u8,
    pub created: u32,
    pub freed: u32,
}

impl LevelStats {
    pub fn live(&self) -> u32 {
        self.created - self.freed
    }
}

impl Debug for LevelStats {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_fmt(format_args!(
            "/{}: {} ({} freed)",
            self.level, self.created, self.freed
        ))
    }
}

//------------ StrideStats ---------------------------------------------------

/// Per-level subtable counters for a table.
///
/// Creations and frees are tracked separately so the total number of
/// subtables that ever existed stays visible after churn.
#[derive(Clone, Serialize)]
pub struct StrideStats {
    levels: Vec<LevelStats>,
}

impl StrideStats {
    pub(crate) fn new(num_levels: u8) -> Self {
        Self {
            levels: (0..num_levels)
                .map(|level| LevelStats {
                    level,
                    created: 0,
                    freed: 0,
                })
                .collect(),
        }
    }

    pub fn levels(&self) -> &[LevelStats] {
        &self.levels
    }

    /// The number of subtables currently alive, the root included.
    pub fn live_subtables(&self) -> u32 {
        self.levels.iter().map(|l| l.live()).sum()
    }

    /// The number of subtables freed over the table's lifetime.
    pub fn subtables_freed(&self) -> u32 {
        self.levels.iter().map(|l| l.freed).sum()
    }

    pub(crate) fn inc_created(&mut self, level: u8) {
        self.levels[level as usize].created += 1;
    }

    pub(crate) fn inc_freed(&mut self, level: u8) {
        self.levels[level as usize].freed += 1;
    }
}

impl Debug for StrideStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "subtables {:>8?} {:?}",
            self.live_subtables(),
            self.levels
        )
    }
}

impl Display for StrideStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "level\tlive\tcreated\tfreed")?;
        for l in &self.levels {
            writeln!(
                f,
                "{}\t{}\t{}\t{}",
                l.level,
                l.live(),
                l.created,
                l.freed
            )?;
        }
        Ok(())
    }
}
