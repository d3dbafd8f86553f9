use serde::de::{self, DeserializeSeed, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A stand-up entry the way the dashboard reads and writes it.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct DashboardRow {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub team_member: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub department: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub yesterday_work: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub today_plan: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub blockers: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub remarks: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub created_at: Option<String>,
    // Read-only on the dashboard side, only filled from the CRM.
    #[serde(default, deserialize_with = "lenient_string")]
    pub resolution_note: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub resolved_at: Option<String>,
}

/// A `Scrum_Updates` record in the CRM's field naming.
///
/// Absent fields are left out when serialized, so an upstream insert never
/// carries a key the dashboard did not send.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct CrmRecord {
    #[serde(rename = "Name", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "Date_Of_Standup", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_standup: Option<String>,
    #[serde(rename = "Team_Member_Name", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub team_member_name: Option<String>,
    #[serde(rename = "Department", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(rename = "Daily_Tasks", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_tasks: Option<String>,
    #[serde(rename = "Today_s_Plan", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub todays_plan: Option<String>,
    #[serde(rename = "Issues_Encountered", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issues_encountered: Option<String>,
    #[serde(rename = "Blocker_Status", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blocker_status: Option<String>,
    #[serde(rename = "Resolution_Note", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution_note: Option<String>,
    #[serde(rename = "Remarks_Notes", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remarks_notes: Option<String>,
    #[serde(rename = "Created_At", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(rename = "Resolved_At", default, deserialize_with = "lenient_string")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockerStatus {
    Open,
    Closed,
    Cleared,
}

impl BlockerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BlockerStatus::Open => "Open",
            BlockerStatus::Closed => "Closed",
            BlockerStatus::Cleared => "Cleared",
        }
    }
}

/// How `Blocker_Status` is derived from a dashboard row on create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum BlockerStatusRule {
    /// `status == "active"` is `Open`, everything else is `Closed`.
    #[default]
    StatusFlag,
    /// Non-blank `blockers` text is `Open`, otherwise `Cleared`.
    BlockersText,
}

impl std::str::FromStr for BlockerStatusRule {
    type Err = ();

    fn from_str(s: &str) -> Result<BlockerStatusRule, ()> {
        match s {
            "status_flag" => Ok(BlockerStatusRule::StatusFlag),
            "blockers_text" => Ok(BlockerStatusRule::BlockersText),
            _ => Err(()),
        }
    }
}

impl BlockerStatusRule {
    pub fn derive(&self, row: &DashboardRow) -> BlockerStatus {
        match self {
            BlockerStatusRule::StatusFlag => match row.status.as_deref() {
                Some("active") => BlockerStatus::Open,
                _ => BlockerStatus::Closed,
            },
            BlockerStatusRule::BlockersText => match row.blockers.as_deref() {
                Some(blockers) if !blockers.trim().is_empty() => BlockerStatus::Open,
                _ => BlockerStatus::Cleared,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CreateMapping {
    pub blocker_status_rule: BlockerStatusRule,
    /// Copies `remarks` into `Resolution_Note` as well, defaulting both to "".
    pub resolution_note_from_remarks: bool,
}

impl CrmRecord {
    pub fn from_dashboard_row(row: &DashboardRow, mapping: &CreateMapping) -> CrmRecord {
        let (remarks_notes, resolution_note) = if mapping.resolution_note_from_remarks {
            let remarks = row.remarks.clone().unwrap_or_default();
            (Some(remarks.clone()), Some(remarks))
        } else {
            (row.remarks.clone(), None)
        };

        CrmRecord {
            name: row.id.clone(),
            date_of_standup: row.date.clone(),
            team_member_name: row.team_member.clone(),
            department: row.department.clone(),
            daily_tasks: row.yesterday_work.clone(),
            todays_plan: row.today_plan.clone(),
            issues_encountered: row.blockers.clone(),
            blocker_status: Some(mapping.blocker_status_rule.derive(row).as_str().to_owned()),
            resolution_note,
            remarks_notes,
            created_at: row.created_at.clone(),
            resolved_at: None,
        }
    }
}

impl DashboardRow {
    pub fn from_crm_record(record: CrmRecord) -> DashboardRow {
        DashboardRow {
            id: record.name,
            date: record.date_of_standup,
            team_member: record.team_member_name,
            department: record.department,
            yesterday_work: record.daily_tasks,
            today_plan: record.todays_plan,
            blockers: record.issues_encountered,
            remarks: record.remarks_notes,
            status: record.blocker_status.map(|status| match status.as_str() {
                "Open" => "active".to_owned(),
                "Closed" | "Cleared" => "closed".to_owned(),
                _ => status,
            }),
            created_at: record.created_at,
            resolution_note: record.resolution_note,
            resolved_at: record.resolved_at,
        }
    }
}

/// Reads a field as text no matter how the other side typed it. Numbers and
/// booleans are stringified, lookups (`{"name": .., "id": ..}`) collapse to
/// their name and anything else is treated as missing.
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    /// `lookups` is false inside a lookup, so a nested object never becomes a name.
    struct LenientStringVisitor {
        lookups: bool,
    }

    impl<'de> DeserializeSeed<'de> for LenientStringVisitor {
        type Value = Option<String>;

        fn deserialize<D>(self, deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }
    }

    impl<'de> Visitor<'de> for LenientStringVisitor {
        type Value = Option<String>;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            formatter.write_str("a string, number, boolean, lookup or null")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Option<String>, E> {
            Ok(Some(v.to_owned()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> Result<Option<String>, E> {
            Ok(Some(v))
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Option<String>, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Option<String>, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Option<String>, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<Option<String>, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> Result<Option<String>, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> Result<Option<String>, E> {
            Ok(None)
        }

        fn visit_some<D>(self, deserializer: D) -> Result<Option<String>, D::Error>
        where
            D: Deserializer<'de>,
        {
            deserializer.deserialize_any(self)
        }

        fn visit_map<A>(self, mut map: A) -> Result<Option<String>, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut name = None;
            while let Some(key) = map.next_key::<String>()? {
                if self.lookups && key == "name" {
                    name = map.next_value_seed(LenientStringVisitor { lookups: false })?;
                } else {
                    map.next_value::<IgnoredAny>()?;
                }
            }
            Ok(name)
        }

        fn visit_seq<A>(self, mut seq: A) -> Result<Option<String>, A::Error>
        where
            A: SeqAccess<'de>,
        {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(None)
        }
    }

    deserializer.deserialize_any(LenientStringVisitor { lookups: true })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn alice() -> DashboardRow {
        serde_json::from_value(json!({
            "id": "r1",
            "date": "2024-01-01",
            "team_member": "Alice",
            "department": "Sales",
            "yesterday_work": "A",
            "today_plan": "B",
            "blockers": "",
            "remarks": "",
            "status": "done",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap()
    }

    #[test]
    fn maps_row_to_crm_record() {
        let record = CrmRecord::from_dashboard_row(&alice(), &CreateMapping::default());

        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({
                "Name": "r1",
                "Date_Of_Standup": "2024-01-01",
                "Team_Member_Name": "Alice",
                "Department": "Sales",
                "Daily_Tasks": "A",
                "Today_s_Plan": "B",
                "Issues_Encountered": "",
                "Remarks_Notes": "",
                "Blocker_Status": "Closed",
                "Created_At": "2024-01-01T00:00:00Z"
            })
        );
    }

    #[test]
    fn mapping_is_deterministic() {
        let row = alice();
        let mapping = CreateMapping::default();
        assert_eq!(
            CrmRecord::from_dashboard_row(&row, &mapping),
            CrmRecord::from_dashboard_row(&row, &mapping)
        );
    }

    #[test]
    fn active_status_opens_blocker() {
        let row = DashboardRow {
            status: Some("active".into()),
            ..Default::default()
        };
        assert_eq!(BlockerStatusRule::StatusFlag.derive(&row), BlockerStatus::Open);

        let row = DashboardRow {
            status: Some("paused".into()),
            ..Default::default()
        };
        assert_eq!(BlockerStatusRule::StatusFlag.derive(&row), BlockerStatus::Closed);
        assert_eq!(
            BlockerStatusRule::StatusFlag.derive(&DashboardRow::default()),
            BlockerStatus::Closed
        );
    }

    #[test]
    fn blockers_text_rule_ignores_whitespace() {
        let rule = BlockerStatusRule::BlockersText;
        let blocked = DashboardRow {
            blockers: Some("waiting on VPN access".into()),
            ..Default::default()
        };
        let blank = DashboardRow {
            blockers: Some("   ".into()),
            status: Some("active".into()),
            ..Default::default()
        };
        assert_eq!(rule.derive(&blocked), BlockerStatus::Open);
        assert_eq!(rule.derive(&blank), BlockerStatus::Cleared);
        assert_eq!(rule.derive(&DashboardRow::default()), BlockerStatus::Cleared);
    }

    #[test]
    fn missing_row_fields_are_left_out() {
        let row = DashboardRow {
            id: Some("r2".into()),
            ..Default::default()
        };
        let record = CrmRecord::from_dashboard_row(&row, &CreateMapping::default());
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({ "Name": "r2", "Blocker_Status": "Closed" })
        );
    }

    #[test]
    fn mirrors_remarks_into_resolution_note() {
        let mapping = CreateMapping {
            blocker_status_rule: BlockerStatusRule::BlockersText,
            resolution_note_from_remarks: true,
        };

        let record = CrmRecord::from_dashboard_row(&DashboardRow::default(), &mapping);
        assert_eq!(record.remarks_notes.as_deref(), Some(""));
        assert_eq!(record.resolution_note.as_deref(), Some(""));
        assert_eq!(record.blocker_status.as_deref(), Some("Cleared"));

        let mut row = alice();
        row.remarks = Some("fixed by ops".into());
        let record = CrmRecord::from_dashboard_row(&row, &mapping);
        assert_eq!(record.resolution_note.as_deref(), Some("fixed by ops"));
        assert_eq!(record.resolved_at, None);
    }

    #[test]
    fn maps_crm_record_back_to_row() {
        let record: CrmRecord = serde_json::from_value(json!({
            "id": "5843000000012345",
            "Name": "r1",
            "Date_Of_Standup": "2024-01-01",
            "Team_Member_Name": "Alice",
            "Department": "Sales",
            "Daily_Tasks": "A",
            "Today_s_Plan": "B",
            "Issues_Encountered": "VPN",
            "Blocker_Status": "Open",
            "Resolution_Note": null,
            "Remarks_Notes": "ping infra",
            "Created_At": "2024-01-01T00:00:00Z",
            "Resolved_At": null
        }))
        .unwrap();

        assert_eq!(
            serde_json::to_value(DashboardRow::from_crm_record(record)).unwrap(),
            json!({
                "id": "r1",
                "date": "2024-01-01",
                "team_member": "Alice",
                "department": "Sales",
                "yesterday_work": "A",
                "today_plan": "B",
                "blockers": "VPN",
                "remarks": "ping infra",
                "status": "active",
                "created_at": "2024-01-01T00:00:00Z",
                "resolution_note": null,
                "resolved_at": null
            })
        );
    }

    #[test]
    fn closed_and_unknown_statuses_on_read() {
        for (upstream, expected) in [("Closed", "closed"), ("Cleared", "closed"), ("On Hold", "On Hold")] {
            let record = CrmRecord {
                blocker_status: Some(upstream.into()),
                ..Default::default()
            };
            assert_eq!(DashboardRow::from_crm_record(record).status.as_deref(), Some(expected));
        }
    }

    #[test]
    fn odd_upstream_values_never_fail() {
        let record: CrmRecord = serde_json::from_value(json!({
            "Name": 42,
            "Team_Member_Name": { "name": "Alice", "id": "58430000001" },
            "Department": ["Sales"],
            "Daily_Tasks": true,
            "Today_s_Plan": { "id": "no-name" }
        }))
        .unwrap();

        let row = DashboardRow::from_crm_record(record);
        assert_eq!(row.id.as_deref(), Some("42"));
        assert_eq!(row.team_member.as_deref(), Some("Alice"));
        assert_eq!(row.department, None);
        assert_eq!(row.yesterday_work.as_deref(), Some("true"));
        assert_eq!(row.today_plan, None);
        assert_eq!(row.created_at, None);
        assert_eq!(row.status, None);
    }

    #[test]
    fn lookup_names_of_any_shape_never_fail() {
        let record: CrmRecord = serde_json::from_value(json!({
            "Team_Member_Name": { "name": 5, "id": "1" },
            "Department": { "name": { "first": "Sales" }, "id": "2" },
            "Daily_Tasks": { "name": ["A"], "id": "3" },
            "Today_s_Plan": { "name": null }
        }))
        .unwrap();

        assert_eq!(record.team_member_name.as_deref(), Some("5"));
        assert_eq!(record.department, None);
        assert_eq!(record.daily_tasks, None);
        assert_eq!(record.todays_plan, None);
    }

    #[test]
    fn parses_blocker_status_rule() {
        assert_eq!("status_flag".parse::<BlockerStatusRule>(), Ok(BlockerStatusRule::StatusFlag));
        assert_eq!("blockers_text".parse::<BlockerStatusRule>(), Ok(BlockerStatusRule::BlockersText));
        assert_eq!("sometimes".parse::<BlockerStatusRule>(), Err(()));
    }
}
