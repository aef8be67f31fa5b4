use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use unicode_segmentation::UnicodeSegmentation;

use crate::errors::MachineError;

/// A head movement: left, stay, or right. Written `L`, `N`, `R`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Left,
    Stay,
    Right,
}

impl FromStr for Direction {
    type Err = MachineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "L" => Ok(Direction::Left),
            "N" => Ok(Direction::Stay),
            "R" => Ok(Direction::Right),
            other => Err(MachineError::InvalidDirection(format!(
                "'{other}' is not one of L, N, R"
            ))),
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Left => "L",
            Direction::Stay => "N",
            Direction::Right => "R",
        })
    }
}

/// A Turing machine tape: a symbol sequence, the blank symbol, and the
/// head position. The tape is immutable; writing and moving return new
/// tapes, auto-extended with blanks whenever the head would fall off
/// either end.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TmTape {
    symbols: Vec<Rc<str>>,
    blank: Rc<str>,
    position: usize,
}

impl TmTape {
    /// A tape holding the given symbols with the head on `position`.
    /// The tape is padded with blanks so something is always under the
    /// head.
    pub fn new(symbols: Vec<Rc<str>>, blank: Rc<str>, position: usize) -> Self {
        let mut symbols = symbols;
        while symbols.len() <= position {
            symbols.push(blank.clone());
        }
        TmTape {
            symbols,
            blank,
            position,
        }
    }

    /// A tape loaded with the graphemes of `input`, head on the first
    /// cell.
    pub fn from_input(input: &str, blank: Rc<str>) -> Self {
        Self::new(input.graphemes(true).map(Rc::from).collect(), blank, 0)
    }

    /// The symbol under the head.
    pub fn read(&self) -> &str {
        &self.symbols[self.position]
    }

    pub(crate) fn read_symbol(&self) -> Rc<str> {
        self.symbols[self.position].clone()
    }

    /// A new tape with the symbol under the head replaced.
    pub fn write(&self, symbol: Rc<str>) -> TmTape {
        let mut symbols = self.symbols.clone();
        symbols[self.position] = symbol;
        TmTape {
            symbols,
            blank: self.blank.clone(),
            position: self.position,
        }
    }

    /// A new tape with the head moved one step in the given direction,
    /// extended with a blank if it would fall off.
    pub fn moved(&self, direction: Direction) -> TmTape {
        let mut symbols = self.symbols.clone();
        let mut position = self.position;
        match direction {
            Direction::Right => {
                position += 1;
                if position == symbols.len() {
                    symbols.push(self.blank.clone());
                }
            }
            Direction::Stay => {}
            Direction::Left => {
                if position == 0 {
                    symbols.insert(0, self.blank.clone());
                } else {
                    position -= 1;
                }
            }
        }
        TmTape {
            symbols,
            blank: self.blank.clone(),
            position,
        }
    }

    /// The head position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// The blank symbol.
    pub fn blank(&self) -> &str {
        &self.blank
    }

    /// The number of cells currently materialized.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Iterates the tape cells left to right.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.symbols.iter().map(|s| s.as_ref())
    }

    /// The tape contents as one string.
    pub fn contents(&self) -> String {
        self.symbols.iter().map(|s| s.as_ref()).collect()
    }
}

impl fmt::Display for TmTape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.contents())?;
        write!(f, "{}^", " ".repeat(self.position))
    }
}
