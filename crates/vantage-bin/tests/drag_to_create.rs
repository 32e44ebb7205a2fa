//! Terminal mouse reports through hit testing, the gesture machine and the
//! coordinator, the same path the runtime takes.

use chrono::{Datelike, NaiveDate};
use core_events::{Event, ModMask, MouseButton, MouseEvent, MouseEventKind, Selection};
use core_input::{GestureMachine, MouseTranslator};
use core_model::{CategoryId, EventId};
use core_render::{GridGeometry, GridHitTest, LayoutContext, YearLayout};
use core_state::Coordinator;
use core_store::{DayRange, Identity, MemoryStore, NewCategory, NewEvent, RemoteStore, StaticIdentity};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

const YEAR: i32 = 2026;
const FRACTION: f32 = 0.75;

fn d(m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(YEAR, m, day).unwrap()
}

fn who() -> Identity {
    Identity::new("u1").unwrap()
}

struct Screen {
    coord: Coordinator,
    rx: mpsc::Receiver<Event>,
    store: Arc<MemoryStore>,
    mouse: MouseTranslator,
    gesture: GestureMachine,
    geometry: GridGeometry,
}

impl Screen {
    /// 256 x 28 gives eight-column, two-row day cells.
    async fn open(store: Arc<MemoryStore>) -> Self {
        let (tx, rx) = mpsc::channel(64);
        let coord = Coordinator::new(store.clone(), Arc::new(StaticIdentity::user("u1")), tx, YEAR);
        let mut screen = Self {
            coord,
            rx,
            store,
            mouse: MouseTranslator::new(),
            gesture: GestureMachine::new(5.0),
            geometry: GridGeometry::fit(256, 28),
        };
        screen.coord.set_year(YEAR).unwrap();
        screen.settle().await;
        screen
    }

    async fn settle(&mut self) {
        while self.coord.ledger().in_flight() > 0 || self.coord.is_loading() {
            let event = tokio::time::timeout(Duration::from_secs(2), self.rx.recv())
                .await
                .expect("sync within timeout")
                .expect("channel open");
            if let Event::Sync(sync) = event {
                self.coord.apply_sync(sync);
            }
        }
    }

    fn at(&self, day: NaiveDate, local_x: u16) -> (u16, u16) {
        let rect = self.geometry.cell_rect(day.month0(), day.day0());
        (rect.x + local_x, rect.y)
    }

    fn report(&mut self, kind: MouseEventKind, column: u16, row: u16) -> Option<Selection> {
        let ev = MouseEvent {
            kind,
            column,
            row,
            mods: ModMask::empty(),
        };
        let layout = YearLayout::build(
            self.coord.snapshot(),
            LayoutContext {
                today: None,
                preview: self.gesture.preview(),
            },
        )
        .unwrap();
        let hit = GridHitTest {
            geometry: self.geometry,
            layout: &layout,
            max_event_fraction: FRACTION,
        };
        let pointer = self.mouse.translate(&ev, &hit);
        pointer.iter().filter_map(|e| self.gesture.handle(e)).last()
    }

    fn down(&mut self, day: NaiveDate, local_x: u16) -> Option<Selection> {
        let (x, y) = self.at(day, local_x);
        self.report(MouseEventKind::Down(MouseButton::Left), x, y)
    }

    fn drag(&mut self, day: NaiveDate) -> Option<Selection> {
        let (x, y) = self.at(day, 0);
        self.report(MouseEventKind::Drag(MouseButton::Left), x, y)
    }

    fn up(&mut self, day: NaiveDate) -> Option<Selection> {
        let (x, y) = self.at(day, 0);
        self.report(MouseEventKind::Up(MouseButton::Left), x, y)
    }
}

async fn store_with_category() -> (Arc<MemoryStore>, CategoryId) {
    let store = Arc::new(MemoryStore::new());
    store.ensure_user(&who()).await.unwrap();
    let cat = store
        .insert_category(
            &who(),
            NewCategory {
                name: "work".into(),
                color: "teal".into(),
            },
        )
        .await
        .unwrap();
    (store, CategoryId::new(cat.id))
}

#[tokio::test]
async fn drag_across_days_creates_a_covering_event() {
    let (store, cat) = store_with_category().await;
    let mut screen = Screen::open(store).await;

    assert_eq!(screen.down(d(3, 3), 7), None);
    assert_eq!(screen.gesture.preview(), Some((d(3, 3), d(3, 3))));
    assert_eq!(screen.drag(d(3, 4)), None);
    assert_eq!(screen.drag(d(3, 6)), None);
    assert_eq!(screen.gesture.preview(), Some((d(3, 3), d(3, 6))));
    let selection = screen.up(d(3, 6)).expect("range selected");
    let Selection::Range { start, end } = selection else {
        panic!("expected a range, got {selection:?}");
    };
    assert_eq!((start, end), (d(3, 3), d(3, 6)));
    assert_eq!(screen.gesture.preview(), None);

    let id = screen.coord.create_event("Trip", start, end, &cat).unwrap();
    assert!(id.is_temporary());
    {
        let layout = YearLayout::build(screen.coord.snapshot(), LayoutContext::default()).unwrap();
        assert_eq!(layout.day(d(3, 5)).unwrap().events.len(), 1);
        assert!(layout.day(d(3, 7)).unwrap().events.is_empty());
    }
    screen.settle().await;

    let remote = screen
        .store
        .list_events(&who(), DayRange::year(YEAR).unwrap())
        .await
        .unwrap();
    assert_eq!(remote.len(), 1);
    assert_eq!(remote[0].start_date, "2026-03-03");
    assert_eq!(remote[0].end_date, "2026-03-06");
    assert_eq!(screen.coord.snapshot().events()[0].id, EventId::new(remote[0].id.clone()));
}

#[tokio::test]
async fn backward_drag_is_normalized() {
    let (store, _) = store_with_category().await;
    let mut screen = Screen::open(store).await;

    screen.down(d(5, 10), 7);
    screen.drag(d(5, 9));
    screen.drag(d(5, 7));
    assert_eq!(
        screen.up(d(5, 7)),
        Some(Selection::Range {
            start: d(5, 7),
            end: d(5, 10)
        })
    );
}

#[tokio::test]
async fn segment_click_selects_event_and_free_column_selects_day() {
    let (store, cat) = store_with_category().await;
    store
        .insert_event(
            &who(),
            NewEvent {
                category_id: cat.to_string(),
                title: "Ski week".into(),
                start_date: "2026-02-05".into(),
                end_date: "2026-02-08".into(),
                description: None,
            },
        )
        .await
        .unwrap();
    let mut screen = Screen::open(store).await;
    let id = screen.coord.snapshot().events()[0].id.clone();

    // One event in an eight-column cell covers columns 0..6.
    assert_eq!(screen.down(d(2, 6), 0), Some(Selection::Event(id.clone())));
    assert!(!screen.gesture.is_active());
    assert_eq!(screen.down(d(2, 6), 5), Some(Selection::Event(id)));

    assert_eq!(screen.down(d(2, 6), 7), None);
    let (x, y) = screen.at(d(2, 6), 7);
    assert_eq!(
        screen.report(MouseEventKind::Up(MouseButton::Left), x, y),
        Some(Selection::Day(d(2, 6)))
    );
}

#[tokio::test]
async fn leaving_the_grid_mid_drag_cancels() {
    let (store, _) = store_with_category().await;
    let mut screen = Screen::open(store).await;

    screen.down(d(7, 1), 7);
    screen.drag(d(7, 3));
    assert!(screen.gesture.is_active());
    let below = screen.geometry.bottom() + 1;
    assert_eq!(
        screen.report(MouseEventKind::Drag(MouseButton::Left), 10, below),
        None
    );
    assert!(!screen.gesture.is_active());
    assert_eq!(
        screen.report(MouseEventKind::Up(MouseButton::Left), 10, below),
        None
    );
    assert!(screen.coord.snapshot().events().is_empty());
}

#[tokio::test]
async fn focus_loss_cancels_an_armed_press() {
    let (store, _) = store_with_category().await;
    let mut screen = Screen::open(store).await;

    screen.down(d(9, 9), 7);
    assert!(screen.gesture.is_active());
    let leave = screen.mouse.focus_lost();
    assert_eq!(screen.gesture.handle(&leave), None);
    assert!(!screen.gesture.is_active());
}
