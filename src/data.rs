use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// Type aliases for clarity
pub type FacultyId = String;
pub type SubjectId = String;
pub type ClassId = String;
pub type Period = u32;

/// A day of the week. Ordering follows the calendar, starting on Monday.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Day {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl fmt::Display for Day {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Day::Monday => "monday",
            Day::Tuesday => "tuesday",
            Day::Wednesday => "wednesday",
            Day::Thursday => "thursday",
            Day::Friday => "friday",
            Day::Saturday => "saturday",
            Day::Sunday => "sunday",
        };
        f.write_str(name)
    }
}

/// A (faculty, subject) eligibility pair supplied by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    pub faculty_id: FacultyId,
    pub subject_id: SubjectId,
}

impl Assignment {
    pub fn new(faculty_id: impl Into<FacultyId>, subject_id: impl Into<SubjectId>) -> Self {
        Self {
            faculty_id: faculty_id.into(),
            subject_id: subject_id.into(),
        }
    }
}

/// Subject details as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubjectRecord {
    pub name: String,
    #[serde(default)]
    pub is_lab: bool,
    /// Contiguous periods per session. Theory subjects always take one.
    #[serde(default = "default_duration")]
    pub duration: u32,
}

fn default_duration() -> u32 {
    1
}

impl SubjectRecord {
    pub fn theory(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            is_lab: false,
            duration: 1,
        }
    }

    pub fn lab(name: impl Into<String>, duration: u32) -> Self {
        Self {
            name: name.into(),
            is_lab: true,
            duration,
        }
    }

    /// Number of periods one session occupies.
    pub fn block_len(&self) -> u32 {
        if self.is_lab { self.duration.max(1) } else { 1 }
    }
}

/// Faculty details as known to the directory.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FacultyRecord {
    pub name: String,
    #[serde(default)]
    pub code: String,
}

impl FacultyRecord {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
        }
    }
}

/// One occupied period inside a day.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    pub period: Period,
    pub subject_id: SubjectId,
    pub faculty_id: FacultyId,
    #[serde(default)]
    pub is_lab: bool,
}

/// A weekly timetable: working day to entries ordered by period.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Schedule {
    pub days: BTreeMap<Day, Vec<Entry>>,
}

impl Schedule {
    /// Entries of `day`, or an empty slice when the day is missing.
    pub fn day(&self, day: Day) -> &[Entry] {
        self.days.get(&day).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn entry_at(&self, day: Day, period: Period) -> Option<&Entry> {
        self.day(day).iter().find(|e| e.period == period)
    }

    pub fn entries(&self) -> impl Iterator<Item = (Day, &Entry)> + '_ {
        self.days
            .iter()
            .flat_map(|(day, entries)| entries.iter().map(move |e| (*day, e)))
    }

    pub fn len(&self) -> usize {
        self.days.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A schedule already stored for some class.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersistedSchedule {
    pub id: ClassId,
    pub schedule: Schedule,
}

/// Pins a subject (matched by name keyword) to the last period of one day.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinnedSlot {
    pub keyword: String,
    pub day: Day,
}

/// Caller-supplied placement rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Guidelines {
    pub pinned_slot: Option<PinnedSlot>,
    pub minimize_consecutive_faculty: bool,
    /// Last-resort fallback that lets a theory subject repeat within a day
    /// rather than leave a slot empty.
    pub allow_same_day_repeat: bool,
}

impl Default for Guidelines {
    fn default() -> Self {
        Self {
            pinned_slot: None,
            minimize_consecutive_faculty: false,
            allow_same_day_repeat: true,
        }
    }
}

/// Structural parameters for one generation call.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleParameters {
    pub periods_per_day: u32,
    pub working_days: Vec<Day>,
    #[serde(default)]
    pub guidelines: Guidelines,
    /// Seed for the tie-break shuffles. Drawn at random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl ScheduleParameters {
    pub fn new(periods_per_day: u32, working_days: Vec<Day>) -> Self {
        Self {
            periods_per_day,
            working_days,
            guidelines: Guidelines::default(),
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_guidelines(mut self, guidelines: Guidelines) -> Self {
        self.guidelines = guidelines;
        self
    }

    pub fn periods(&self) -> impl Iterator<Item = Period> {
        1..=self.periods_per_day
    }

    pub fn contains_period(&self, period: Period) -> bool {
        (1..=self.periods_per_day).contains(&period)
    }

    /// First period counted as afternoon for lab placement.
    pub fn afternoon_threshold(&self) -> Period {
        if self.periods_per_day >= 6 {
            self.periods_per_day / 2 + 1
        } else {
            1
        }
    }

    pub fn total_slots(&self) -> u32 {
        self.working_days.len() as u32 * self.periods_per_day
    }
}

/// Which strategy produced an accepted schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CandidateOrigin {
    Local,
    External,
}

/// Category of a problem found (and possibly left) by the repair pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum WarningKind {
    UnknownReference,
    InvalidSlot,
    FacultyConflict,
    SameDayRepeat,
}

/// A residual issue in an accepted schedule. The schedule is still returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationWarning {
    pub kind: WarningKind,
    pub day: Day,
    pub period: Option<Period>,
    pub message: String,
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.period {
            Some(period) => write!(f, "[{:?}] {} p{}: {}", self.kind, self.day, period, self.message),
            None => write!(f, "[{:?}] {}: {}", self.kind, self.day, self.message),
        }
    }
}

/// The final output of one generation call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOutcome {
    pub schedule: Schedule,
    pub warnings: Vec<ValidationWarning>,
    pub source: CandidateOrigin,
    pub seed: u64,
}
