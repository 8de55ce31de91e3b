use std::collections::HashMap;

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumIter};
use time::OffsetDateTime;

/// The stats domains exposed by the etcd v2 API.
#[derive(Debug, Clone, Copy, Display, EnumIter, Eq, PartialEq, Hash)]
#[strum(serialize_all = "lowercase")]
pub enum StatsCategory {
    Leader,
    #[strum(serialize = "self")]
    SelfNode,
    Store,
}

impl StatsCategory {
    pub fn path(&self) -> &'static str {
        match self {
            StatsCategory::Leader => "/v2/stats/leader",
            StatsCategory::SelfNode => "/v2/stats/self",
            StatsCategory::Store => "/v2/stats/store",
        }
    }
}

/// etcd encodes nil maps and unset values as `null`; those decode to the zero value like missing keys do.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn followers<'de, D>(deserializer: D) -> Result<HashMap<String, FollowerStats>, D::Error>
where
    D: Deserializer<'de>,
{
    let followers = Option::<HashMap<String, Option<FollowerStats>>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(followers.into_iter().map(|(id, stats)| (id, stats.unwrap_or_default())).collect())
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerCounts {
    #[serde(deserialize_with = "null_as_default")]
    pub fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub success: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FollowerLatency {
    #[serde(deserialize_with = "null_as_default")]
    pub average: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub current: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub maximum: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub minimum: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub standard_deviation: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FollowerStats {
    #[serde(deserialize_with = "null_as_default")]
    pub counts: FollowerCounts,
    #[serde(deserialize_with = "null_as_default")]
    pub latency: FollowerLatency,
}

/// Response of `/v2/stats/leader`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderStats {
    #[serde(deserialize_with = "followers")]
    pub followers: HashMap<String, FollowerStats>,
    #[serde(deserialize_with = "null_as_default")]
    pub leader: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LeaderInfo {
    #[serde(deserialize_with = "null_as_default")]
    pub leader: String,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub uptime: String,
}

/// Response of `/v2/stats/self`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelfStats {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub leader_info: LeaderInfo,
    #[serde(deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(deserialize_with = "null_as_default")]
    pub recv_append_request_cnt: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub recv_bandwidth_rate: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub recv_pkg_rate: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub send_append_request_cnt: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub start_time: String,
    #[serde(deserialize_with = "null_as_default")]
    pub state: String,
}

/// Response of `/v2/stats/store`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoreStats {
    #[serde(deserialize_with = "null_as_default")]
    pub gets_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub gets_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub sets_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub sets_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub delete_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub delete_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub update_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub update_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub create_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub create_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub compare_and_swap_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub compare_and_swap_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub compare_and_delete_success: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub compare_and_delete_fail: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub expire_count: u64,
    #[serde(deserialize_with = "null_as_default")]
    pub watchers: u64,
}

/// A decoded stats record. Serializes as `{"<category>": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Stats {
    #[serde(rename = "leader")]
    Leader(LeaderStats),
    #[serde(rename = "self")]
    SelfNode(SelfStats),
    #[serde(rename = "store")]
    Store(StoreStats),
}

impl Stats {
    pub fn category(&self) -> StatsCategory {
        match self {
            Stats::Leader(_) => StatsCategory::Leader,
            Stats::SelfNode(_) => StatsCategory::SelfNode,
            Stats::Store(_) => StatsCategory::Store,
        }
    }
}

/// Event handed to the publisher, one per successfully fetched category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    #[serde(rename = "@timestamp", with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    #[serde(rename = "type")]
    pub beat_type: String,
    #[serde(flatten)]
    pub stats: Stats,
}

impl Event {
    pub fn new(beat_type: &str, stats: Stats) -> Self {
        Self {
            timestamp: OffsetDateTime::now_utc(),
            beat_type: beat_type.to_owned(),
            stats,
        }
    }

    pub fn category(&self) -> StatsCategory {
        self.stats.category()
    }
}
