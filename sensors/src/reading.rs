use std::fmt;

/// Filtered state of one directional channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChannelState {
    #[default]
    Inactive,
    Active,
    /// Stuck active for too long; treated as no signal.
    Saturated,
}

impl ChannelState {
    pub fn is_active(self) -> bool {
        self == ChannelState::Active
    }

    fn flag(self) -> char {
        match self {
            ChannelState::Inactive => '0',
            ChannelState::Active => '1',
            ChannelState::Saturated => 'S',
        }
    }
}

/// The four detectors of the sensor cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Top,
    Bottom,
    Left,
    Right,
}

impl Channel {
    pub const ALL: [Channel; 4] = [Channel::Top, Channel::Bottom, Channel::Left, Channel::Right];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Coarse compass direction of the beacon relative to the sensor cross.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Signal present but both pairs balanced.
    Center,
    Left,
    Right,
    Up,
    Down,
    UpLeft,
    UpRight,
    DownLeft,
    DownRight,
    /// No channel active.
    None,
}

/// Snapshot of all four filtered channels for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SensorReading {
    pub top: ChannelState,
    pub bottom: ChannelState,
    pub left: ChannelState,
    pub right: ChannelState,
}

impl SensorReading {
    pub fn new(
        top: ChannelState,
        bottom: ChannelState,
        left: ChannelState,
        right: ChannelState,
    ) -> SensorReading {
        SensorReading {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn get(&self, channel: Channel) -> ChannelState {
        match channel {
            Channel::Top => self.top,
            Channel::Bottom => self.bottom,
            Channel::Left => self.left,
            Channel::Right => self.right,
        }
    }

    pub fn top_active(&self) -> bool {
        self.top.is_active()
    }

    pub fn bottom_active(&self) -> bool {
        self.bottom.is_active()
    }

    pub fn left_active(&self) -> bool {
        self.left.is_active()
    }

    pub fn right_active(&self) -> bool {
        self.right.is_active()
    }

    /// True if any channel is `Active`. Saturated channels do not count.
    pub fn any_active(&self) -> bool {
        Channel::ALL.iter().any(|c| self.get(*c).is_active())
    }

    pub fn none_active(&self) -> bool {
        !self.any_active()
    }

    pub fn direction(&self) -> Direction {
        if self.none_active() {
            return Direction::None;
        }

        // -1 left / up, +1 right / down
        let h = bias(self.left_active(), self.right_active());
        let v = bias(self.top_active(), self.bottom_active());

        match (h, v) {
            (-1, -1) => Direction::UpLeft,
            (-1, 0) => Direction::Left,
            (-1, 1) => Direction::DownLeft,
            (0, -1) => Direction::Up,
            (0, 1) => Direction::Down,
            (1, -1) => Direction::UpRight,
            (1, 0) => Direction::Right,
            (1, 1) => Direction::DownRight,
            _ => Direction::Center,
        }
    }
}

fn bias(negative: bool, positive: bool) -> i8 {
    match (negative, positive) {
        (true, false) => -1,
        (false, true) => 1,
        _ => 0,
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "T={} B={} L={} R={}",
            self.top.flag(),
            self.bottom.flag(),
            self.left.flag(),
            self.right.flag()
        )
    }
}
