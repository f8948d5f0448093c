use std::{collections::HashMap, time::Duration};

use serde::Serialize;
use shared::domain::{NodeId, ServiceStatus};
use tracing::{debug, info, warn};

use crate::SequencerError;

pub const BASE_DELAY: Duration = Duration::from_millis(800);
pub const WAVE_INTERVAL: Duration = Duration::from_millis(1200);
pub const SETTLE_DELAY: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CascadeWave {
    pub nodes: Vec<NodeId>,
    pub target: ServiceStatus,
}

impl CascadeWave {
    pub fn new<I, N>(nodes: I, target: ServiceStatus) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<NodeId>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            target,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeConfig {
    pub base_delay: Duration,
    pub wave_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for CascadeConfig {
    fn default() -> Self {
        Self {
            base_delay: BASE_DELAY,
            wave_interval: WAVE_INTERVAL,
            settle_delay: SETTLE_DELAY,
        }
    }
}

impl CascadeConfig {
    /// Offset of wave `index` from the start of a run.
    pub fn wave_delay(&self, index: usize) -> Duration {
        self.base_delay + self.wave_interval * index as u32
    }

    /// Offset at which a run of `waves` waves is marked settled.
    pub fn settle_at(&self, waves: usize) -> Duration {
        self.wave_delay(waves.saturating_sub(1)) + self.settle_delay
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum CascadePhase {
    Pending,
    Revealing { wave: usize },
    Settled,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CascadeEvent {
    Restarted,
    WaveRevealed {
        wave: usize,
        nodes: Vec<NodeId>,
        target: ServiceStatus,
    },
    Settled,
}

/// Which entities have moved to their failure state, wave by wave.
#[derive(Debug, Clone)]
pub struct Cascade {
    config: CascadeConfig,
    waves: Vec<CascadeWave>,
    membership: HashMap<NodeId, usize>,
    baseline: ServiceStatus,
    phase: CascadePhase,
    animating: bool,
}

impl Cascade {
    pub fn new(config: CascadeConfig, waves: Vec<CascadeWave>) -> Result<Self, SequencerError> {
        if waves.is_empty() {
            return Err(SequencerError::NoWaves);
        }
        let mut membership = HashMap::new();
        for (index, wave) in waves.iter().enumerate() {
            if wave.nodes.is_empty() {
                return Err(SequencerError::EmptyWave { index });
            }
            for node in &wave.nodes {
                if membership.insert(node.clone(), index).is_some() {
                    return Err(SequencerError::OverlappingWave { node: node.clone() });
                }
            }
        }
        Ok(Self {
            config,
            waves,
            membership,
            baseline: ServiceStatus::Healthy,
            phase: CascadePhase::Pending,
            animating: false,
        })
    }

    pub fn config(&self) -> &CascadeConfig {
        &self.config
    }

    pub fn waves(&self) -> &[CascadeWave] {
        &self.waves
    }

    pub fn phase(&self) -> CascadePhase {
        self.phase
    }

    pub fn is_animating(&self) -> bool {
        self.animating
    }

    /// Index of the last revealed wave.
    pub fn current_wave(&self) -> Option<usize> {
        match self.phase {
            CascadePhase::Pending => None,
            CascadePhase::Revealing { wave } => Some(wave),
            CascadePhase::Settled => Some(self.waves.len() - 1),
        }
    }

    pub fn is_revealed(&self, node: &NodeId) -> bool {
        match (self.membership.get(node), self.current_wave()) {
            (Some(&index), Some(current)) => current >= index,
            _ => false,
        }
    }

    /// Status to draw for `node` right now; nodes outside every wave stay at
    /// the baseline.
    pub fn status_of(&self, node: &NodeId) -> ServiceStatus {
        match self.membership.get(node) {
            Some(&index) if self.is_revealed(node) => self.waves[index].target,
            _ => self.baseline,
        }
    }

    pub fn restart(&mut self) -> CascadeEvent {
        self.phase = CascadePhase::Pending;
        self.animating = true;
        info!(waves = self.waves.len(), "cascade restarted");
        CascadeEvent::Restarted
    }

    /// Reveals wave `index` if it is the next one due; anything else is
    /// ignored so waves can never be skipped or replayed.
    pub fn reveal(&mut self, index: usize) -> Option<CascadeEvent> {
        let expected = match self.phase {
            CascadePhase::Pending => 0,
            CascadePhase::Revealing { wave } => wave + 1,
            CascadePhase::Settled => self.waves.len(),
        };
        if !self.animating || index != expected || index >= self.waves.len() {
            warn!(index, expected, "ignoring out-of-order wave");
            return None;
        }
        self.phase = CascadePhase::Revealing { wave: index };
        let wave = &self.waves[index];
        debug!(wave = index, nodes = wave.nodes.len(), target = wave.target.label(), "wave revealed");
        Some(CascadeEvent::WaveRevealed {
            wave: index,
            nodes: wave.nodes.clone(),
            target: wave.target,
        })
    }

    pub fn settle(&mut self) -> Option<CascadeEvent> {
        let last = self.waves.len() - 1;
        if self.phase != (CascadePhase::Revealing { wave: last }) {
            warn!(phase = ?self.phase, "cannot settle before the last wave");
            return None;
        }
        self.phase = CascadePhase::Settled;
        self.animating = false;
        info!("cascade settled");
        Some(CascadeEvent::Settled)
    }
}
