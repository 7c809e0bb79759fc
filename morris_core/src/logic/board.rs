use serde::{Deserialize, Serialize};

/// Index of one of the 24 points of the board.
pub type Cell = u8;

pub const NUM_CELLS: usize = 24;
pub const PIECES_PER_PLAYER: u8 = 9;

/// The 16 winning lines. Each ring is numbered clockwise from its top-left
/// corner (`8 * ring + k`, corners on even `k`), the cross lines join the
/// mid-points of the three rings.
pub const MILLS: [[Cell; 3]; 16] = [
    [0, 1, 2],
    [2, 3, 4],
    [4, 5, 6],
    [6, 7, 0],
    [8, 9, 10],
    [10, 11, 12],
    [12, 13, 14],
    [14, 15, 8],
    [16, 17, 18],
    [18, 19, 20],
    [20, 21, 22],
    [22, 23, 16],
    [1, 9, 17],
    [3, 11, 19],
    [5, 13, 21],
    [7, 15, 23],
];

/// Neighbours of every point along the drawn lines of the board.
pub const ADJACENCY: [&[Cell]; NUM_CELLS] = [
    &[1, 7],
    &[0, 2, 9],
    &[1, 3],
    &[2, 4, 11],
    &[3, 5],
    &[4, 6, 13],
    &[5, 7],
    &[6, 0, 15],
    &[9, 15],
    &[8, 10, 1, 17],
    &[9, 11],
    &[10, 12, 3, 19],
    &[11, 13],
    &[12, 14, 5, 21],
    &[13, 15],
    &[14, 8, 7, 23],
    &[17, 23],
    &[16, 18, 9],
    &[17, 19],
    &[18, 20, 11],
    &[19, 21],
    &[20, 22, 13],
    &[21, 23],
    &[22, 16, 15],
];

/// Mid-points: three or four neighbours instead of the corners' two.
pub const STRATEGIC_CELLS: [Cell; 12] = [1, 3, 5, 7, 9, 11, 13, 15, 17, 19, 21, 23];

/// Middle-ring mid-points, the cells the rule-based player grabs first.
pub const PREFERRED_CELLS: [Cell; 8] = [9, 11, 13, 15, 17, 19, 21, 23];

/// `LINES_THROUGH[cell]` lists the indices into `MILLS` of the two lines
/// passing through `cell`.
pub const LINES_THROUGH: [[usize; 2]; NUM_CELLS] = lines_through();

const fn lines_through() -> [[usize; 2]; NUM_CELLS] {
    let mut table = [[0; 2]; NUM_CELLS];
    let mut filled = [0usize; NUM_CELLS];
    let mut line = 0;
    while line < MILLS.len() {
        let mut i = 0;
        while i < 3 {
            let cell = MILLS[line][i] as usize;
            table[cell][filled[cell]] = line;
            filled[cell] += 1;
            i += 1;
        }
        line += 1;
    }
    table
}

#[must_use]
pub const fn is_strategic(cell: Cell) -> bool {
    cell % 2 == 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Player {
    One,
    Two,
}

impl Player {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::One => Self::Two,
            Self::Two => Self::One,
        }
    }

    pub const fn index(self) -> usize {
        match self {
            Self::One => 0,
            Self::Two => 1,
        }
    }

    const fn code(self) -> u64 {
        match self {
            Self::One => 1,
            Self::Two => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Board {
    cells: [Option<Player>; NUM_CELLS],
}

impl Board {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            cells: [None; NUM_CELLS],
        }
    }

    #[must_use]
    pub const fn from_cells(cells: [Option<Player>; NUM_CELLS]) -> Self {
        Self { cells }
    }

    /// Builds a board from a 24-character diagram: `1`/`X` for player one,
    /// `2`/`O` for player two, anything else empty. Whitespace is ignored.
    #[must_use]
    pub fn from_diagram(diagram: &str) -> Option<Self> {
        let mut board = Self::new();
        let mut idx = 0;
        for ch in diagram.chars().filter(|c| !c.is_whitespace()) {
            let slot = board.cells.get_mut(idx)?;
            *slot = match ch {
                '1' | 'X' | 'x' => Some(Player::One),
                '2' | 'O' | 'o' => Some(Player::Two),
                _ => None,
            };
            idx += 1;
        }
        (idx == NUM_CELLS).then_some(board)
    }

    pub fn cells(&self) -> &[Option<Player>; NUM_CELLS] {
        &self.cells
    }

    #[must_use]
    pub fn get(&self, cell: Cell) -> Option<Player> {
        self.cells.get(usize::from(cell)).copied().flatten()
    }

    pub fn set(&mut self, cell: Cell, owner: Option<Player>) {
        if let Some(slot) = self.cells.get_mut(usize::from(cell)) {
            *slot = owner;
        }
    }

    #[must_use]
    pub fn is_empty_cell(&self, cell: Cell) -> bool {
        usize::from(cell) < NUM_CELLS && self.get(cell).is_none()
    }

    pub fn empty_cells(&self) -> impl Iterator<Item = Cell> + '_ {
        (0..NUM_CELLS as Cell).filter(|&c| self.get(c).is_none())
    }

    pub fn cells_of(&self, player: Player) -> impl Iterator<Item = Cell> + '_ {
        (0..NUM_CELLS as Cell).filter(move |&c| self.get(c) == Some(player))
    }

    #[must_use]
    pub fn count(&self, player: Player) -> u8 {
        self.cells.iter().filter(|&&c| c == Some(player)).count() as u8
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(Option::is_some)
    }

    /// The owner of the first fully owned winning line, if any.
    #[must_use]
    pub fn winner(&self) -> Option<Player> {
        MILLS.iter().find_map(|line| self.line_owner(line))
    }

    #[must_use]
    pub fn line_owner(&self, line: &[Cell; 3]) -> Option<Player> {
        let first = self.get(line[0])?;
        (self.get(line[1]) == Some(first) && self.get(line[2]) == Some(first)).then_some(first)
    }

    /// Counts own and empty cells in `line` from `player`'s point of view.
    #[must_use]
    pub fn line_counts(&self, line: &[Cell; 3], player: Player) -> (u8, u8, u8) {
        let mut own = 0;
        let mut opp = 0;
        let mut empty = 0;
        for &c in line {
            match self.get(c) {
                Some(p) if p == player => own += 1,
                Some(_) => opp += 1,
                None => empty += 1,
            }
        }
        (own, opp, empty)
    }

    /// Exact 48-bit encoding, two bits per cell.
    #[must_use]
    pub fn key(&self) -> u64 {
        self.cells.iter().enumerate().fold(0u64, |acc, (i, c)| {
            acc | (c.map_or(0, Player::code) << (2 * i))
        })
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sym = |c: Cell| match self.get(c) {
            Some(Player::One) => 'X',
            Some(Player::Two) => 'O',
            None => '.',
        };
        writeln!(f, "{}-----{}-----{}", sym(0), sym(1), sym(2))?;
        writeln!(f, "| {}---{}---{} |", sym(8), sym(9), sym(10))?;
        writeln!(f, "| | {}-{}-{} | |", sym(16), sym(17), sym(18))?;
        writeln!(
            f,
            "{}-{}-{}   {}-{}-{}",
            sym(7),
            sym(15),
            sym(23),
            sym(19),
            sym(11),
            sym(3)
        )?;
        writeln!(f, "| | {}-{}-{} | |", sym(22), sym(21), sym(20))?;
        writeln!(f, "| {}---{}---{} |", sym(14), sym(13), sym(12))?;
        write!(f, "{}-----{}-----{}", sym(6), sym(5), sym(4))
    }
}
