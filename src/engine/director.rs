use crate::config::{ModePhase, ReleaseTrigger};
use crate::engine::ghost::Ghost;
use crate::types::GlobalMode;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DirectorTick {
    pub mode_changed: Option<GlobalMode>,
    pub released: Vec<usize>,
}

#[derive(Clone, Debug)]
pub struct ModeDirector {
    schedule: Vec<ModePhase>,
    releases: Vec<ReleaseTrigger>,
    released: Vec<bool>,
    elapsed: u64,
    current: Option<GlobalMode>,
}

impl ModeDirector {
    pub fn new(schedule: Vec<ModePhase>, releases: Vec<ReleaseTrigger>) -> Self {
        let released = vec![false; releases.len()];
        Self {
            schedule,
            releases,
            released,
            elapsed: 0,
            current: None,
        }
    }

    pub fn mode(&self) -> GlobalMode {
        self.current.unwrap_or_else(|| self.mode_at(0))
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn mode_at(&self, elapsed: u64) -> GlobalMode {
        let mut start = 0u64;
        for phase in &self.schedule {
            let Some(len) = phase.ticks else {
                return phase.mode;
            };
            let end = start.saturating_add(len);
            if elapsed < end {
                return phase.mode;
            }
            start = end;
        }
        self.schedule
            .last()
            .map(|phase| phase.mode)
            .unwrap_or(GlobalMode::Scatter)
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self, ghost: usize) -> bool {
        self.released.get(ghost).copied().unwrap_or(false)
    }

    pub fn restart(&mut self) {
        self.elapsed = 0;
        self.current = None;
        self.released.iter_mut().for_each(|flag| *flag = false);
    }

    pub fn tick(&mut self, collectibles_eaten: u32, ghosts: &mut [Ghost]) -> DirectorTick {
        let now = self.elapsed;
        self.elapsed += 1;

        let mut out = DirectorTick::default();
        let mode = self.mode_at(now);
        if self.current != Some(mode) {
            if self.current.is_some() {
                out.mode_changed = Some(mode);
            }
            self.current = Some(mode);
            for ghost in ghosts.iter_mut() {
                ghost.apply_global_mode(mode);
            }
        }

        for (idx, trigger) in self.releases.iter().enumerate() {
            if self.released[idx] {
                continue;
            }
            let due = match *trigger {
                ReleaseTrigger::Ticks(at) => now >= at,
                ReleaseTrigger::Collectibles(count) => collectibles_eaten >= count,
            };
            if !due {
                continue;
            }
            self.released[idx] = true;
            if let Some(ghost) = ghosts.get_mut(idx) {
                if ghost.release() {
                    out.released.push(idx);
                }
            }
        }
        out
    }
}
