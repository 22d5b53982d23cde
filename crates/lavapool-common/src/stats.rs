use serde::Deserialize;

/// Penalty reported for a node that is unavailable or has never sent a load
/// report. Large enough that pool selection never picks it.
pub const SENTINEL_PENALTY: f64 = 9e30;

/// Memory section of a node load report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryStats {
    #[serde(default)]
    pub free: u64,
    #[serde(default)]
    pub used: u64,
    #[serde(default)]
    pub allocated: u64,
    #[serde(default)]
    pub reservable: u64,
}

/// CPU section of a node load report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuStats {
    #[serde(default)]
    pub cores: u32,
    #[serde(default)]
    pub system_load: f64,
    #[serde(default)]
    pub lavalink_load: f64,
}

/// Frame statistics, averaged per minute. Only present while a node is
/// actively sending audio.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameStats {
    #[serde(default)]
    pub sent: i64,
    #[serde(default)]
    pub nulled: i64,
    #[serde(default)]
    pub deficit: i64,
}

/// A node's periodic load report (the `op: stats` channel message).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeStats {
    #[serde(default)]
    pub players: u64,
    #[serde(default)]
    pub playing_players: u64,
    /// Node uptime in milliseconds.
    #[serde(default)]
    pub uptime: u64,
    #[serde(default)]
    pub memory: MemoryStats,
    #[serde(default)]
    pub cpu: CpuStats,
    #[serde(default)]
    pub frame_stats: Option<FrameStats>,
}

impl NodeStats {
    /// Computes the load-balancing penalty breakdown for this report.
    pub fn penalty(&self) -> Penalty {
        Penalty::from_stats(self)
    }
}

/// Load-balancing score derived from a [`NodeStats`] report. Lower is
/// better; pool selection ranks nodes by `total`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalty {
    pub player: f64,
    pub cpu: f64,
    pub deficit_frame: f64,
    pub null_frame: f64,
    pub total: f64,
}

impl Penalty {
    fn from_stats(stats: &NodeStats) -> Self {
        let player = stats.playing_players as f64;
        let cpu = 1.05f64.powf(100.0 * stats.cpu.system_load) * 10.0 - 10.0;

        let (deficit_frame, null_frame) = match &stats.frame_stats {
            Some(frames) => {
                let deficit =
                    1.03f64.powf(500.0 * (frames.deficit as f64 / 3000.0)) * 600.0 - 600.0;
                let nulled =
                    (1.03f64.powf(500.0 * (frames.nulled as f64 / 3000.0)) * 300.0 - 300.0) * 2.0;
                (deficit, nulled)
            }
            None => (0.0, 0.0),
        };

        Self {
            player,
            cpu,
            deficit_frame,
            null_frame,
            total: player + cpu + deficit_frame + null_frame,
        }
    }
}
