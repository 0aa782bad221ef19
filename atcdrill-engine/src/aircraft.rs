//! Aircraft model and factory
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

use crate::constants::{
    CALLSIGN_NUMBER_MAX, CALLSIGN_PREFIXES, CALLSIGN_SUFFIX_CHANCE, FLIGHT_LEVEL_BAND,
    FLIGHT_LEVEL_STEP, HISTORY_INTERVAL_SECS, HISTORY_POINTS, HORIZONTAL_EDGE_INSET_PX,
    SIDE_EDGE_MARGIN_PX,
};
use crate::kinematics::Position;
use crate::turn::TurnDirection;
use crate::viewport::{PixelScale, Viewport};

/// Trailing display dots, nearest first.
pub type TrackHistory = SmallVec<[Position; HISTORY_POINTS]>;

/// Identifier of an aircraft within a scenario (1 or 2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AircraftId(u8);

impl AircraftId {
    pub const FIRST: Self = Self(1);
    pub const SECOND: Self = Self(2);

    #[must_use]
    pub const fn new(id: u8) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for AircraftId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Colour token of the separation indicator shared by a conflict pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SepColor {
    /// Placeholder before a pair is assigned its colour.
    #[default]
    White,
    SkyBlue,
    Pink,
    Apricot,
    Orchid,
    Periwinkle,
    Cyan,
}

impl SepColor {
    /// Palette drawn from when a pair is generated.
    pub const PALETTE: [Self; 6] = [
        Self::SkyBlue,
        Self::Pink,
        Self::Apricot,
        Self::Orchid,
        Self::Periwinkle,
        Self::Cyan,
    ];

    #[must_use]
    pub const fn hex(self) -> &'static str {
        match self {
            Self::White => "#FFFFFF",
            Self::SkyBlue => "#99D9EA",
            Self::Pink => "#FF99B8",
            Self::Apricot => "#FFD18F",
            Self::Orchid => "#C540D4",
            Self::Periwinkle => "#8C8CFF",
            Self::Cyan => "#00DCFF",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::PALETTE[rng.gen_range(0..Self::PALETTE.len())]
    }
}

/// One aircraft: cosmetic identity plus kinematic state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aircraft {
    pub id: AircraftId,
    pub position: Position,
    /// As-filed heading in radians. Never changed after generation.
    pub original_heading: f64,
    /// As-flown heading in radians.
    pub heading: f64,
    pub speed_px_per_sec: f64,
    pub speed_knots: f64,
    pub pending_turn_degrees: i32,
    pub history: TrackHistory,
    pub callsign: String,
    pub flight_level: u32,
    pub sep_color: SepColor,
}

impl Aircraft {
    /// Aircraft at `position` with no identity and zeroed kinematics.
    #[must_use]
    pub fn blank(id: AircraftId, position: Position) -> Self {
        Self {
            id,
            position,
            original_heading: 0.0,
            heading: 0.0,
            speed_px_per_sec: 0.0,
            speed_knots: 0.0,
            pending_turn_degrees: 0,
            history: TrackHistory::new(),
            callsign: String::new(),
            flight_level: 0,
            sep_color: SepColor::default(),
        }
    }

    /// Set the ground speed and derive the on-screen speed from `scale`.
    pub fn set_speed_knots(&mut self, knots: f64, scale: PixelScale) {
        self.speed_knots = knots;
        self.rescale(scale);
    }

    /// Recompute the pixel speed after the display scale changed.
    pub fn rescale(&mut self, scale: PixelScale) {
        self.speed_px_per_sec = scale.knots_to_px_per_sec(self.speed_knots);
    }

    /// Move from `from` to `to` pixels per NM around `anchor`. Position and
    /// history dots stretch with the scale, so NM geometry is unchanged.
    pub fn zoom(&mut self, from: PixelScale, to: PixelScale, anchor: Position) {
        let factor = to.pixels_per_nm() / from.pixels_per_nm();
        self.position = self.position.scaled_about(anchor, factor);
        for dot in &mut self.history {
            *dot = dot.scaled_about(anchor, factor);
        }
        self.rescale(to);
    }

    /// Point both headings at `heading`; used while no turn is issued.
    pub(crate) fn file_heading(&mut self, heading: f64) {
        self.original_heading = heading;
        self.heading = heading;
        self.pending_turn_degrees = 0;
    }

    /// Rebuild the trailing dots behind the current position.
    pub fn populate_history(&mut self) {
        let spacing = self.speed_px_per_sec * HISTORY_INTERVAL_SECS;
        let (origin, heading) = (self.position, self.heading);
        let mut back = 0.0;
        let history: TrackHistory = (0..HISTORY_POINTS)
            .map(|_| {
                back += spacing;
                origin.advanced(heading, -back)
            })
            .collect();
        self.history = history;
    }

    /// Controller instruction shown in the command strip.
    #[must_use]
    pub fn command_text(&self) -> String {
        match TurnDirection::of(self.pending_turn_degrees) {
            None => format!("{}...", self.callsign),
            Some(direction) => format!(
                "{} turn {} {} degrees",
                self.callsign,
                direction,
                self.pending_turn_degrees.unsigned_abs()
            ),
        }
    }
}

/// Viewport edge an aircraft enters from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

impl Edge {
    pub const ALL: [Self; 4] = [Self::Top, Self::Right, Self::Bottom, Self::Left];

    /// Spawn point on this edge, `t` in [0, 1) selecting the offset along it.
    #[must_use]
    pub fn spawn_point(self, viewport: &Viewport, t: f64) -> Position {
        let inset_width = 2.0f64.mul_add(-HORIZONTAL_EDGE_INSET_PX, viewport.width);
        let along_x = t.mul_add(inset_width, HORIZONTAL_EDGE_INSET_PX);
        let along_y = t * viewport.play_height() + viewport.play_top();
        match self {
            Self::Top => Position::new(along_x, viewport.play_top()),
            Self::Right => Position::new(viewport.width - SIDE_EDGE_MARGIN_PX, along_y),
            Self::Bottom => Position::new(along_x, viewport.play_bottom()),
            Self::Left => Position::new(SIDE_EDGE_MARGIN_PX, along_y),
        }
    }
}

/// Where freshly created aircraft appear.
pub trait SpawnSource {
    fn spawn_position(
        &mut self,
        id: AircraftId,
        viewport: &Viewport,
        rng: &mut dyn RngCore,
    ) -> Position;
}

/// Uniformly random edge, uniformly random offset along it.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeSpawn;

impl SpawnSource for EdgeSpawn {
    fn spawn_position(
        &mut self,
        _id: AircraftId,
        viewport: &Viewport,
        rng: &mut dyn RngCore,
    ) -> Position {
        let edge = Edge::ALL[rng.gen_range(0..Edge::ALL.len())];
        let t = rng.r#gen::<f64>();
        edge.spawn_point(viewport, t)
    }
}

/// Fixed spawn points keyed by aircraft; id 1 takes the first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSpawn(pub [Position; 2]);

impl SpawnSource for FixedSpawn {
    fn spawn_position(
        &mut self,
        id: AircraftId,
        _viewport: &Viewport,
        _rng: &mut dyn RngCore,
    ) -> Position {
        if id == AircraftId::SECOND {
            self.0[1]
        } else {
            self.0[0]
        }
    }
}

/// Random ICAO-style callsign such as `BAW123` or `KLM7C`.
pub fn generate_callsign<R: Rng + ?Sized>(rng: &mut R) -> String {
    let prefix = CALLSIGN_PREFIXES[rng.gen_range(0..CALLSIGN_PREFIXES.len())];
    let number = rng.gen_range(1..=CALLSIGN_NUMBER_MAX);
    let mut callsign = format!("{prefix}{number}");
    if rng.gen_bool(CALLSIGN_SUFFIX_CHANCE) {
        callsign.push(char::from(b'A' + rng.gen_range(0..26u8)));
    }
    callsign
}

/// Random cruise flight level, e.g. 350 for FL350.
pub fn generate_flight_level<R: Rng + ?Sized>(rng: &mut R) -> u32 {
    let (low, high) = FLIGHT_LEVEL_BAND;
    let steps = (high - low) / FLIGHT_LEVEL_STEP;
    low + rng.gen_range(0..=steps) * FLIGHT_LEVEL_STEP
}

/// Create an aircraft on a random viewport edge with a random identity.
/// Heading and speed are left at zero for the caller to set.
pub fn create_aircraft<R: RngCore>(id: AircraftId, viewport: &Viewport, rng: &mut R) -> Aircraft {
    create_aircraft_with(&mut EdgeSpawn, id, viewport, rng)
}

/// Same as [`create_aircraft`] with an explicit spawn source.
pub fn create_aircraft_with<S, R>(
    spawn: &mut S,
    id: AircraftId,
    viewport: &Viewport,
    rng: &mut R,
) -> Aircraft
where
    S: SpawnSource + ?Sized,
    R: RngCore,
{
    let position = spawn.spawn_position(id, viewport, &mut *rng);
    let mut aircraft = Aircraft::blank(id, position);
    aircraft.callsign = generate_callsign(rng);
    aircraft.flight_level = generate_flight_level(rng);
    aircraft
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FLOAT_EPSILON;
    use crate::kinematics::distance;
    use rand::SeedableRng;
    use rand_chacha::ChaCha20Rng;

    #[test]
    fn edge_spawns_stay_inside_play_area() {
        let viewport = Viewport::new(1_200.0, 900.0);
        let mut rng = ChaCha20Rng::seed_from_u64(3);
        for _ in 0..200 {
            let aircraft = create_aircraft(AircraftId::FIRST, &viewport, &mut rng);
            let p = aircraft.position;
            let x_range = HORIZONTAL_EDGE_INSET_PX - FLOAT_EPSILON..=1_150.0 + FLOAT_EPSILON;
            assert!(x_range.contains(&p.x));
            assert!((160.0 - FLOAT_EPSILON..=740.0 + FLOAT_EPSILON).contains(&p.y));
            assert!(aircraft.speed_knots.abs() < f64::EPSILON);
            assert!(aircraft.heading.abs() < f64::EPSILON);
        }
    }

    #[test]
    fn edges_pin_one_coordinate() {
        let viewport = Viewport::new(1_000.0, 800.0);
        assert!((Edge::Top.spawn_point(&viewport, 0.5).y - 160.0).abs() < f64::EPSILON);
        assert!((Edge::Bottom.spawn_point(&viewport, 0.5).y - 640.0).abs() < f64::EPSILON);
        assert!((Edge::Left.spawn_point(&viewport, 0.5).x - 60.0).abs() < f64::EPSILON);
        assert!((Edge::Right.spawn_point(&viewport, 0.5).x - 940.0).abs() < f64::EPSILON);
        assert!((Edge::Top.spawn_point(&viewport, 0.0).x - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn identity_follows_icao_shape() {
        let mut rng = ChaCha20Rng::seed_from_u64(99);
        for _ in 0..200 {
            let callsign = generate_callsign(&mut rng);
            let prefix = &callsign[..3];
            assert!(CALLSIGN_PREFIXES.contains(&prefix));
            let rest = &callsign[3..];
            let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
            assert!((1..=3).contains(&digits.len()), "{callsign}");
            let tail = &rest[digits.len()..];
            let one_letter = tail.len() == 1 && tail.chars().all(|c| c.is_ascii_uppercase());
            assert!(tail.is_empty() || one_letter);

            let level = generate_flight_level(&mut rng);
            assert!((320..=400).contains(&level));
            assert_eq!(level % 10, 0);
        }
    }

    #[test]
    fn fixed_spawn_uses_positions_by_id() {
        let a = Position::new(1.0, 2.0);
        let b = Position::new(3.0, 4.0);
        let mut spawn = FixedSpawn([a, b]);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let viewport = Viewport::default();
        let first = create_aircraft_with(&mut spawn, AircraftId::FIRST, &viewport, &mut rng);
        let second = create_aircraft_with(&mut spawn, AircraftId::SECOND, &viewport, &mut rng);
        assert_eq!((first.position, second.position), (a, b));
    }

    #[test]
    fn history_trails_behind_heading() {
        let mut aircraft = Aircraft::blank(AircraftId::FIRST, Position::new(500.0, 400.0));
        aircraft.file_heading(0.0);
        aircraft.set_speed_knots(360.0, PixelScale::new(10.0));
        aircraft.populate_history();
        assert_eq!(aircraft.history.len(), HISTORY_POINTS);
        assert!((aircraft.history[0].x - 496.0).abs() < FLOAT_EPSILON);
        assert!((aircraft.history[4].x - 480.0).abs() < FLOAT_EPSILON);
        let nearest = distance(aircraft.history[0], aircraft.position);
        assert!(nearest < distance(aircraft.history[4], aircraft.position));
    }

    #[test]
    fn rescale_keeps_knots_and_pixels_consistent() {
        let mut aircraft = Aircraft::blank(AircraftId::FIRST, Position::default());
        aircraft.set_speed_knots(450.0, PixelScale::new(8.0));
        assert!((aircraft.speed_px_per_sec - 1.0).abs() < FLOAT_EPSILON);
        aircraft.rescale(PixelScale::new(16.0));
        assert!((aircraft.speed_px_per_sec - 2.0).abs() < FLOAT_EPSILON);
        assert!((aircraft.speed_knots - 450.0).abs() < f64::EPSILON);
    }

    #[test]
    fn zoom_stretches_position_and_history_about_anchor() {
        let mut aircraft = Aircraft::blank(AircraftId::FIRST, Position::new(110.0, 50.0));
        aircraft.set_speed_knots(450.0, PixelScale::new(8.0));
        aircraft.populate_history();
        let first_dot = aircraft.history[0];

        aircraft.zoom(PixelScale::new(8.0), PixelScale::new(16.0), Position::new(100.0, 100.0));
        assert!((aircraft.position.x - 120.0).abs() < FLOAT_EPSILON);
        assert!((aircraft.position.y - 0.0).abs() < FLOAT_EPSILON);
        let stretched_x = 2.0f64.mul_add(first_dot.x - 100.0, 100.0);
        assert!((aircraft.history[0].x - stretched_x).abs() < 1e-9);
        assert!((aircraft.speed_px_per_sec - 2.0).abs() < FLOAT_EPSILON);
        assert!((aircraft.speed_knots - 450.0).abs() < f64::EPSILON);
    }

    #[test]
    fn command_text_reflects_pending_turn() {
        let mut aircraft = Aircraft::blank(AircraftId::FIRST, Position::default());
        aircraft.callsign = "CTN123".to_string();
        assert_eq!(aircraft.command_text(), "CTN123...");
        aircraft.apply_turn(15);
        assert_eq!(aircraft.command_text(), "CTN123 turn right 15 degrees");
        aircraft.apply_turn(-20);
        assert_eq!(aircraft.command_text(), "CTN123 turn left 20 degrees");
    }

    #[test]
    fn palette_excludes_placeholder() {
        let mut rng = ChaCha20Rng::seed_from_u64(5);
        for _ in 0..50 {
            assert_ne!(SepColor::random(&mut rng), SepColor::White);
        }
        assert_eq!(SepColor::Orchid.hex(), "#C540D4");
    }
}
