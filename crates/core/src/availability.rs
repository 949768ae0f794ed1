//! Grouping of a professional's open slots by calendar date.
//!
//! Slots are grouped by the local date of their start, in the order the
//! backend returned them. No sorting happens here; the backend returns
//! slots chronologically, so the first group is the earliest date.

use chrono::{Datelike, NaiveDate, TimeZone, Weekday};
use indexmap::IndexMap;

use crate::error::CoreError;
use crate::models::Availability;

// ---------------------------------------------------------------------------
// Grouping
// ---------------------------------------------------------------------------

/// Slots grouped by local calendar date, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AvailabilityGroups {
    groups: IndexMap<NaiveDate, Vec<Availability>>,
}

/// Group `slots` by the date of their start instant in `tz`.
pub fn group_by_date<Tz: TimeZone>(slots: &[Availability], tz: &Tz) -> AvailabilityGroups {
    let mut groups: IndexMap<NaiveDate, Vec<Availability>> = IndexMap::new();
    for slot in slots {
        let date = slot.start.with_timezone(tz).date_naive();
        groups.entry(date).or_default().push(slot.clone());
    }
    AvailabilityGroups { groups }
}

impl AvailabilityGroups {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Number of distinct dates.
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Dates in first-seen order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.groups.keys().copied()
    }

    /// The date selected when the step opens: the first group.
    pub fn default_date(&self) -> Option<NaiveDate> {
        self.groups.keys().next().copied()
    }

    /// Slots on `date`, empty if there are none.
    pub fn slots_for(&self, date: NaiveDate) -> &[Availability] {
        self.groups.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.groups.contains_key(&date)
    }

    /// Total number of slots across all dates.
    pub fn total_slots(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    /// Iterate `(date, slots)` pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &[Availability])> {
        self.groups.iter().map(|(d, s)| (*d, s.as_slice()))
    }
}

// ---------------------------------------------------------------------------
// Slot picker
// ---------------------------------------------------------------------------

/// Date/slot selection state of the availability step.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SlotPicker {
    groups: AvailabilityGroups,
    selected: Option<NaiveDate>,
}

impl SlotPicker {
    /// Build a picker with the first date pre-selected.
    pub fn new(groups: AvailabilityGroups) -> Self {
        let selected = groups.default_date();
        Self { groups, selected }
    }

    pub fn groups(&self) -> &AvailabilityGroups {
        &self.groups
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected
    }

    /// Switch the displayed date.
    pub fn select_date(&mut self, date: NaiveDate) -> Result<(), CoreError> {
        if !self.groups.contains(date) {
            return Err(CoreError::Validation(format!(
                "No availability on {}",
                format_date_key(date)
            )));
        }
        self.selected = Some(date);
        Ok(())
    }

    /// Slots of the selected date.
    pub fn visible_slots(&self) -> &[Availability] {
        match self.selected {
            Some(date) => self.groups.slots_for(date),
            None => &[],
        }
    }

    /// Look up a visible slot by id.
    pub fn find_visible(&self, slot_id: crate::types::EntityId) -> Option<&Availability> {
        self.visible_slots().iter().find(|s| s.id == slot_id)
    }
}

// ---------------------------------------------------------------------------
// Formatting
// ---------------------------------------------------------------------------

/// `YYYY-MM-DD` key of a date.
pub fn format_date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn weekday_short_fr(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "lun.",
        Weekday::Tue => "mar.",
        Weekday::Wed => "mer.",
        Weekday::Thu => "jeu.",
        Weekday::Fri => "ven.",
        Weekday::Sat => "sam.",
        Weekday::Sun => "dim.",
    }
}

const MONTHS_FR: [&str; 12] = [
    "janv.", "févr.", "mars", "avr.", "mai", "juin", "juil.", "août", "sept.", "oct.", "nov.",
    "déc.",
];

/// Short French label of a date, e.g. `lun. 10 juin`.
pub fn format_date_label(date: NaiveDate) -> String {
    format!(
        "{} {} {}",
        weekday_short_fr(date.weekday()),
        date.day(),
        MONTHS_FR[date.month0() as usize]
    )
}

/// `HH:MM - HH:MM` label of a slot in `tz`.
pub fn slot_label<Tz: TimeZone>(slot: &Availability, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!(
        "{} - {}",
        slot.start.with_timezone(tz).format("%H:%M"),
        slot.end.with_timezone(tz).format("%H:%M")
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
