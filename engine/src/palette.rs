use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};
use tabsense_protocol::{ClusterId, TabId};

/// The fixed palette a native tab-group facility accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupColor {
    Grey,
    Blue,
    Red,
    Yellow,
    Green,
    Pink,
    Purple,
    Cyan,
}

pub const PALETTE: [GroupColor; 8] = [
    GroupColor::Grey,
    GroupColor::Blue,
    GroupColor::Red,
    GroupColor::Yellow,
    GroupColor::Green,
    GroupColor::Pink,
    GroupColor::Purple,
    GroupColor::Cyan,
];

impl GroupColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupColor::Grey => "grey",
            GroupColor::Blue => "blue",
            GroupColor::Red => "red",
            GroupColor::Yellow => "yellow",
            GroupColor::Green => "green",
            GroupColor::Pink => "pink",
            GroupColor::Purple => "purple",
            GroupColor::Cyan => "cyan",
        }
    }
}

/// Pick a palette color for a cluster: the label hashes to a stable bucket,
/// and the cluster's position offsets it so two identically-labeled clusters
/// do not collide.
pub fn color_for(label: &str, index: usize) -> GroupColor {
    let digest = Sha1::digest(label.as_bytes());
    let bucket = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]) as usize
        % PALETTE.len();
    PALETTE[(bucket + index) % PALETTE.len()]
}

/// One cluster's actuation order: realize this grouping with this label and
/// color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActuationRequest {
    pub cluster_id: ClusterId,
    pub label: String,
    pub color: GroupColor,
    pub tab_ids: Vec<TabId>,
}
