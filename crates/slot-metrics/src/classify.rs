//! Classification helpers shared by the aggregators.
//!
//! - [`memory_tier`]: bins a slot's memory into a capacity-tier label
//! - [`sanitize`]: makes free-form group/owner names safe as key segments
//! - [`classify`]: decides the effective slot type and state of a record
//! - [`accounting_identity`]: derives the (group, owner) pair of a claimed slot

use once_cell::sync::Lazy;
use regex::Regex;

use crate::records::{SlotRecord, SlotState, SlotType};

/// Minimum free memory (MB) a partitionable slot needs to stay schedulable.
pub const MIN_FREE_MEMORY_MB: f64 = 1000.0;

/// Minimum free disk (KB) a partitionable slot needs to stay schedulable.
pub const MIN_FREE_DISK_KB: f64 = 1_048_576.0;

/// Label used when a group or owner cannot be determined.
pub const UNKNOWN: &str = "Unknown";

/// `group_<group>.<owner>@<domain>`; the group capture is greedy, so
/// `group_cms.prod.bob@host` yields group `cms.prod` and owner `bob`.
static ACCOUNTING_GROUP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^group_(\S+)\.(\S+)@\S+$").unwrap_or_else(|_| unreachable!())
});

/// `slot<N>@<host>.<domain>` names of partitionable slots.
static SLOT_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^slot\d+@([\w\-]*)\..*$").unwrap_or_else(|_| unreachable!())
});

/// Bins a memory size (MB) into a tier label.
///
/// 1 GB and 2 GB get their own tiers, everything up to 32 GB rounds up to the
/// next multiple of 4 GB, and anything larger is `gt_32gb_mem`. The quarter
/// is taken with integer division before rounding, so 4097 MB still lands in
/// `lteq_4gb_mem`.
///
/// # Example
///
/// ```
/// use slot_metrics::memory_tier;
///
/// assert_eq!(memory_tier(2049), "lteq_4gb_mem");
/// assert_eq!(memory_tier(32768), "lteq_32gb_mem");
/// ```
#[must_use]
pub fn memory_tier(memory_mb: i64) -> String {
    if memory_mb <= 1024 {
        "lteq_1gb_mem".to_string()
    } else if memory_mb <= 2048 {
        "lteq_2gb_mem".to_string()
    } else if memory_mb > 32768 {
        "gt_32gb_mem".to_string()
    } else {
        let quarter = memory_mb / 4;
        let gb = (quarter + 1023) / 1024 * 4;
        format!("lteq_{gb}gb_mem")
    }
}

/// Makes a free-form name usable as a single key segment.
///
/// `None` stays `None`; otherwise `.` becomes `_`, `@` becomes `-` and spaces
/// become `_`.
#[must_use]
pub fn sanitize(key: Option<&str>) -> Option<String> {
    key.map(sanitize_segment)
}

/// [`sanitize`] for a name that is known to be present.
#[must_use]
pub fn sanitize_segment(key: &str) -> String {
    key.replace('.', "_").replace('@', "-").replace(' ', "_")
}

/// The effective classification of one slot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// Slot type the record is accounted under after reclassification.
    pub slot_type: SlotType,
    /// State the record is accounted under after reclassification.
    pub state: SlotState,
    /// The record is a partitionable slot with too little free capacity left.
    pub exhausted: bool,
}

/// Computes the effective (type, state) pair of a slot record.
///
/// A partitionable slot with no free cpus, less than 1000 MB of free memory
/// or less than 1 GB of free disk is exhausted: its leftover capacity is
/// accounted as a `Dynamic` slot in state `Unusable`. Every other record
/// keeps its reported type and state.
#[must_use]
pub fn classify(record: &SlotRecord) -> Classification {
    let slot_type = record.slot_type();
    let state = record.state();

    let exhausted = slot_type == SlotType::Partitionable
        && (record.cpus.is_zero()
            || record.memory.as_f64() < MIN_FREE_MEMORY_MB
            || record.disk.as_f64() < MIN_FREE_DISK_KB);

    if exhausted {
        Classification {
            slot_type: SlotType::Dynamic,
            state: SlotState::Unusable,
            exhausted,
        }
    } else {
        Classification {
            slot_type,
            state,
            exhausted,
        }
    }
}

/// The accounting group and owner a claimed slot is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountingIdentity {
    /// Accounting group, `None` for jobs submitted outside any group.
    pub group: String,
    /// Submitting user.
    pub owner: String,
}

/// Derives the (group, owner) pair of a claimed slot.
///
/// `AccountingGroup` wins when it parses; otherwise `RemoteGroup` supplies the
/// group (`<none>` becomes `None`) and the user part of `RemoteOwner` supplies
/// the owner. Anything still missing is `Unknown`.
#[must_use]
pub fn accounting_identity(record: &SlotRecord) -> AccountingIdentity {
    let mut group = UNKNOWN.to_string();
    let mut owner = UNKNOWN.to_string();

    if let Some(caps) = record
        .accounting_group
        .as_deref()
        .and_then(|g| ACCOUNTING_GROUP_REGEX.captures(g))
    {
        group = caps[1].to_string();
        owner = caps[2].to_string();
    }

    if group == UNKNOWN {
        if let Some(remote_group) = record.remote_group.as_deref() {
            group = if remote_group == "<none>" {
                "None".to_string()
            } else {
                remote_group.to_string()
            };
        }
    }

    if owner == UNKNOWN {
        if let Some(remote_owner) = record.remote_owner.as_deref() {
            owner = user_part(remote_owner).to_string();
        }
    }

    AccountingIdentity { group, owner }
}

/// Returns the part of `user@domain` before the first `@`.
#[must_use]
pub fn user_part(principal: &str) -> &str {
    principal.split('@').next().unwrap_or(principal)
}

/// Extracts the host label from a `slot<N>@<host>.<domain>` slot name.
#[must_use]
pub fn slot_hostname(name: &str) -> Option<&str> {
    SLOT_NAME_REGEX
        .captures(name)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MetricValue;
    use test_case::test_case;

    #[test_case(0, "lteq_1gb_mem" ; "zero")]
    #[test_case(1024, "lteq_1gb_mem" ; "exactly one gb")]
    #[test_case(1025, "lteq_2gb_mem" ; "just over one gb")]
    #[test_case(2048, "lteq_2gb_mem" ; "exactly two gb")]
    #[test_case(2049, "lteq_4gb_mem" ; "just over two gb")]
    #[test_case(4096, "lteq_4gb_mem" ; "exactly four gb")]
    #[test_case(4097, "lteq_4gb_mem" ; "quarter floors before rounding")]
    #[test_case(4100, "lteq_8gb_mem" ; "next bucket")]
    #[test_case(8000, "lteq_8gb_mem" ; "typical slot")]
    #[test_case(20000, "lteq_20gb_mem" ; "twenty gb bucket")]
    #[test_case(32768, "lteq_32gb_mem" ; "exactly thirty two gb")]
    #[test_case(32769, "gt_32gb_mem" ; "just over thirty two gb")]
    #[test_case(256_000, "gt_32gb_mem" ; "large memory")]
    fn memory_tier_boundaries(memory: i64, expected: &str) {
        assert_eq!(memory_tier(memory), expected);
    }

    #[test]
    fn sanitize_none_stays_none() {
        assert_eq!(sanitize(None), None);
    }

    #[test_case("a.b@c d", "a_b-c_d" ; "all replacements")]
    #[test_case("alice", "alice" ; "already safe")]
    #[test_case("cms.prod", "cms_prod" ; "dotted group")]
    #[test_case("bob@fnal.gov", "bob-fnal_gov" ; "principal")]
    #[test_case("", "" ; "empty")]
    fn sanitize_replacements(input: &str, expected: &str) {
        assert_eq!(sanitize(Some(input)).as_deref(), Some(expected));
    }

    fn partitionable(cpus: i64, memory: i64, disk: i64) -> SlotRecord {
        let mut record = SlotRecord::new(SlotType::Partitionable, SlotState::Unclaimed);
        record.cpus = MetricValue::Int(cpus);
        record.memory = MetricValue::Int(memory);
        record.disk = MetricValue::Int(disk);
        record
    }

    #[test]
    fn classify_keeps_static_slots() {
        let record = SlotRecord::new(SlotType::Static, SlotState::Claimed);
        let class = classify(&record);
        assert_eq!(class.slot_type, SlotType::Static);
        assert_eq!(class.state, SlotState::Claimed);
        assert!(!class.exhausted);
    }

    #[test]
    fn classify_defaults_missing_attributes() {
        let class = classify(&SlotRecord::default());
        assert_eq!(class.slot_type, SlotType::Static);
        assert_eq!(class.state, SlotState::Unknown);
    }

    #[test]
    fn classify_healthy_partitionable_slot() {
        let class = classify(&partitionable(8, 16000, 50_000_000));
        assert_eq!(class.slot_type, SlotType::Partitionable);
        assert_eq!(class.state, SlotState::Unclaimed);
        assert!(!class.exhausted);
    }

    #[test_case(0, 16000, 50_000_000 ; "no cpus")]
    #[test_case(8, 999, 50_000_000 ; "low memory")]
    #[test_case(8, 16000, 1_048_575 ; "low disk")]
    fn classify_exhausted_partitionable_slot(cpus: i64, memory: i64, disk: i64) {
        let class = classify(&partitionable(cpus, memory, disk));
        assert_eq!(class.slot_type, SlotType::Dynamic);
        assert_eq!(class.state, SlotState::Unusable);
        assert!(class.exhausted);
    }

    #[test]
    fn classify_thresholds_are_strict() {
        assert!(!classify(&partitionable(1, 1000, 1_048_576)).exhausted);
    }

    #[test]
    fn classify_never_reclassifies_dynamic_slots() {
        let mut record = SlotRecord::new(SlotType::Dynamic, SlotState::Claimed);
        record.cpus = MetricValue::Int(0);
        let class = classify(&record);
        assert_eq!(class.slot_type, SlotType::Dynamic);
        assert_eq!(class.state, SlotState::Claimed);
    }

    fn claimed() -> SlotRecord {
        SlotRecord::new(SlotType::Dynamic, SlotState::Claimed)
    }

    #[test]
    fn identity_from_accounting_group() {
        let mut record = claimed();
        record.accounting_group = Some("group_physics.alice@submit.example".to_string());
        let id = accounting_identity(&record);
        assert_eq!(id.group, "physics");
        assert_eq!(id.owner, "alice");
    }

    #[test]
    fn identity_nested_group_is_greedy() {
        let mut record = claimed();
        record.accounting_group = Some("group_cms.prod.bob@host.example".to_string());
        let id = accounting_identity(&record);
        assert_eq!(id.group, "cms.prod");
        assert_eq!(id.owner, "bob");
    }

    #[test]
    fn identity_falls_back_to_remote_attributes() {
        let mut record = claimed();
        record.accounting_group = Some("not-a-group".to_string());
        record.remote_group = Some("<none>".to_string());
        record.remote_owner = Some("carol@submit.example".to_string());
        let id = accounting_identity(&record);
        assert_eq!(id.group, "None");
        assert_eq!(id.owner, "carol");
    }

    #[test]
    fn identity_remote_group_verbatim() {
        let mut record = claimed();
        record.remote_group = Some("atlas".to_string());
        let id = accounting_identity(&record);
        assert_eq!(id.group, "atlas");
        assert_eq!(id.owner, UNKNOWN);
    }

    #[test]
    fn identity_accounting_group_beats_remote_owner() {
        let mut record = claimed();
        record.accounting_group = Some("group_physics.alice@submit.example".to_string());
        record.remote_owner = Some("mallory@elsewhere".to_string());
        record.remote_group = Some("other".to_string());
        let id = accounting_identity(&record);
        assert_eq!(id.group, "physics");
        assert_eq!(id.owner, "alice");
    }

    #[test]
    fn identity_unknown_without_attributes() {
        let id = accounting_identity(&claimed());
        assert_eq!(id.group, UNKNOWN);
        assert_eq!(id.owner, UNKNOWN);
    }

    #[test_case("slot1@node01.example.org", Some("node01") ; "simple")]
    #[test_case("slot12@wn-a-3.cluster.local", Some("wn-a-3") ; "multi digit slot and hyphens")]
    #[test_case("slot1@node01", None ; "no domain")]
    #[test_case("node01.example.org", None ; "no slot prefix")]
    #[test_case("slot1_1@node01.example.org", None ; "dynamic slot name")]
    #[test_case("slot1@.example.org", Some("") ; "empty host")]
    fn slot_hostname_extraction(name: &str, expected: Option<&str>) {
        assert_eq!(slot_hostname(name), expected);
    }

    #[test]
    fn user_part_splits_on_first_at() {
        assert_eq!(user_part("alice@submit.example"), "alice");
        assert_eq!(user_part("alice"), "alice");
        assert_eq!(user_part("a@b@c"), "a");
    }
}
