//! Per-day coverage for a whole year.
//!
//! The grid is always 12 month rows by 31 day slots. Slots past a month's
//! length are placeholders. Each real day lists the events covering it in
//! ascending id order, so stacking never depends on snapshot insertion order
//! and does not jitter when a refetch replaces the snapshot.

use chrono::{Datelike, NaiveDate, Weekday};
use core_model::{
    CalendarEvent, CategoryId, ColorToken, ModelResult, YearSnapshot, covers_day, days_in_month,
};

/// Day slots per month row.
pub const GRID_COLUMNS: u32 = 31;

pub const MONTH_LABELS: [&str; 12] = [
    "JAN", "FEB", "MAR", "APR", "MAY", "JUN", "JUL", "AUG", "SEP", "OCT", "NOV", "DEC",
];

/// Events covering `day`, ordered by id.
pub fn events_on(events: &[CalendarEvent], day: NaiveDate) -> Vec<&CalendarEvent> {
    let mut covering: Vec<&CalendarEvent> = events.iter().filter(|e| covers_day(e, day)).collect();
    covering.sort_by(|a, b| a.id.cmp(&b.id));
    covering
}

/// Color of a category, or `fallback` when the category is gone.
pub fn color_of(snapshot: &YearSnapshot, category_id: &CategoryId, fallback: ColorToken) -> ColorToken {
    match snapshot.category(category_id) {
        Some(category) => category.color,
        None => {
            tracing::trace!(target: "layout", category = %category_id, "dangling_category");
            fallback
        }
    }
}

/// Host-supplied context that is not part of the snapshot.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayoutContext {
    /// Local calendar date of "today".
    pub today: Option<NaiveDate>,
    /// Inclusive live drag range.
    pub preview: Option<(NaiveDate, NaiveDate)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayCell<'a> {
    pub date: NaiveDate,
    pub weekend: bool,
    pub today: bool,
    pub selected: bool,
    /// Covering events in stacking order.
    pub events: Vec<&'a CalendarEvent>,
}

impl DayCell<'_> {
    /// One-character coverage summary used by the plain-text dump.
    pub fn glyph(&self) -> char {
        match self.events.len() {
            0 => '.',
            1 => '#',
            _ => '+',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GridCell<'a> {
    Day(DayCell<'a>),
    Placeholder,
}

impl<'a> GridCell<'a> {
    pub fn as_day(&self) -> Option<&DayCell<'a>> {
        match self {
            GridCell::Day(cell) => Some(cell),
            GridCell::Placeholder => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthRow<'a> {
    /// Zero-based month index.
    pub month: u32,
    pub label: &'static str,
    /// Always [`GRID_COLUMNS`] entries.
    pub cells: Vec<GridCell<'a>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearLayout<'a> {
    pub year: i32,
    pub months: Vec<MonthRow<'a>>,
}

impl<'a> YearLayout<'a> {
    pub fn build(snapshot: &'a YearSnapshot, ctx: LayoutContext) -> ModelResult<Self> {
        let year = snapshot.year;
        let mut months = Vec::with_capacity(12);
        for month in 0..12u32 {
            let len = days_in_month(year, month)?;
            let cells = (1..=GRID_COLUMNS)
                .map(|slot| {
                    if slot > len {
                        return GridCell::Placeholder;
                    }
                    match NaiveDate::from_ymd_opt(year, month + 1, slot) {
                        Some(date) => GridCell::Day(day_cell(snapshot, date, &ctx)),
                        None => GridCell::Placeholder,
                    }
                })
                .collect();
            months.push(MonthRow {
                month,
                label: MONTH_LABELS[month as usize],
                cells,
            });
        }
        tracing::trace!(target: "layout", year, events = snapshot.events().len(), "year_layout_built");
        Ok(Self { year, months })
    }

    /// Cell at zero-based `month` and zero-based day `slot`.
    pub fn cell(&self, month: u32, slot: u32) -> Option<&GridCell<'a>> {
        self.months
            .get(month as usize)
            .and_then(|row| row.cells.get(slot as usize))
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayCell<'a>> {
        if date.year() != self.year {
            return None;
        }
        self.cell(date.month0(), date.day0())
            .and_then(GridCell::as_day)
    }

    /// Every real day, month by month.
    pub fn days(&self) -> impl Iterator<Item = &DayCell<'a>> {
        self.months
            .iter()
            .flat_map(|row| row.cells.iter().filter_map(GridCell::as_day))
    }

    /// Plain-text rendering: the year on the first line, then one line per
    /// month with a glyph per slot (`.` free, `#` one event, `+` stacked,
    /// space for placeholders).
    pub fn to_plain(&self) -> String {
        let mut out = format!("{}\n", self.year);
        for row in &self.months {
            out.push_str(row.label);
            out.push(' ');
            for cell in &row.cells {
                out.push(match cell {
                    GridCell::Day(day) => day.glyph(),
                    GridCell::Placeholder => ' ',
                });
            }
            out.push('\n');
        }
        out
    }
}

fn day_cell<'a>(snapshot: &'a YearSnapshot, date: NaiveDate, ctx: &LayoutContext) -> DayCell<'a> {
    DayCell {
        date,
        weekend: matches!(date.weekday(), Weekday::Sat | Weekday::Sun),
        today: ctx.today == Some(date),
        selected: ctx
            .preview
            .is_some_and(|(start, end)| start <= date && date <= end),
        events: events_on(snapshot.events(), date),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_model::{Category, EventId};
    use pretty_assertions::assert_eq;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, day).unwrap()
    }

    fn ev(id: &str, start: NaiveDate, end: NaiveDate) -> CalendarEvent {
        CalendarEvent::new(EventId::from(id), "x", start, end, CategoryId::from("c1")).unwrap()
    }

    fn teal() -> Category {
        Category::new(CategoryId::from("c1"), "work", ColorToken::Teal).unwrap()
    }

    #[test]
    fn stacking_is_by_id_not_insertion() {
        let events = vec![
            ev("b", d(3, 1), d(3, 3)),
            ev("c", d(3, 2), d(3, 2)),
            ev("a", d(2, 27), d(3, 2)),
        ];
        let ids: Vec<&str> = events_on(&events, d(3, 2))
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(ids, ["a", "b", "c"]);
    }

    #[test]
    fn february_has_placeholders_after_the_28th() {
        let snap = YearSnapshot::new(2026);
        let layout = YearLayout::build(&snap, LayoutContext::default()).unwrap();
        let feb = &layout.months[1];
        assert_eq!(feb.label, "FEB");
        assert_eq!(feb.cells.len(), 31);
        assert!(feb.cells[27].as_day().is_some());
        assert_eq!(feb.cells[28], GridCell::Placeholder);
        assert_eq!(layout.days().count(), 365);
    }

    #[test]
    fn cell_flags_follow_context() {
        let snap = YearSnapshot::new(2026);
        let ctx = LayoutContext {
            today: Some(d(5, 14)),
            preview: Some((d(5, 12), d(5, 15))),
        };
        let layout = YearLayout::build(&snap, ctx).unwrap();
        let today = layout.day(d(5, 14)).unwrap();
        assert!(today.today && today.selected);
        assert!(!layout.day(d(5, 16)).unwrap().selected);
        // 2026-05-16 is a Saturday.
        assert!(layout.day(d(5, 16)).unwrap().weekend);
        assert!(!layout.day(d(5, 15)).unwrap().weekend);
    }

    #[test]
    fn plain_dump_marks_coverage_and_stacking() {
        let snap = YearSnapshot::from_parts(
            2026,
            vec![teal()],
            vec![ev("a", d(1, 2), d(1, 4)), ev("b", d(1, 4), d(1, 5))],
        );
        let layout = YearLayout::build(&snap, LayoutContext::default()).unwrap();
        let plain = layout.to_plain();
        let mut lines = plain.lines();
        assert_eq!(lines.next(), Some("2026"));
        assert_eq!(
            lines.next(),
            Some("JAN .##+#..........................")
        );
        assert_eq!(
            lines.next(),
            Some("FEB ............................   ")
        );
    }

    #[test]
    fn dangling_category_falls_back() {
        let snap = YearSnapshot::from_parts(2026, vec![teal()], Vec::new());
        assert_eq!(
            color_of(&snap, &CategoryId::from("c1"), ColorToken::FALLBACK),
            ColorToken::Teal
        );
        assert_eq!(
            color_of(&snap, &CategoryId::from("gone"), ColorToken::FALLBACK),
            ColorToken::Gray
        );
    }
}
