//! Human-readable ticket codes: `A1` … `A10`, `B1` … `Z10`.
//!
//! Codes are issued per service day from a fixed space of 26 letters × 10
//! digits. After `Z10` the sequence wraps to `A1` and codes repeat; nothing
//! here tries to avoid that collision.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// Digits per letter. Digits run `1..=DIGITS`.
pub const DIGITS: u8 = 10;
pub const LETTERS: u8 = 26;

/// A display code such as `B7`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TicketNumber {
  /// `0` for `A` through `25` for `Z`.
  letter: u8,
  /// `1..=DIGITS`.
  digit:  u8,
}

impl TicketNumber {
  pub const FIRST: Self = Self { letter: 0, digit: 1 };

  pub fn new(letter: char, digit: u8) -> Option<Self> {
    if !letter.is_ascii_uppercase() || !(1..=DIGITS).contains(&digit) {
      return None;
    }
    Some(Self { letter: letter as u8 - b'A', digit })
  }

  pub fn letter(self) -> char { (b'A' + self.letter) as char }

  pub fn digit(self) -> u8 { self.digit }

  /// Position in the daily sequence: `letter_rank * 10 + digit`.
  pub fn ordinal(self) -> u16 {
    u16::from(self.letter) * u16::from(DIGITS) + u16::from(self.digit)
  }

  /// The code issued after this one, wrapping `Z10` to `A1`.
  pub fn successor(self) -> Self {
    if self.digit < DIGITS {
      return Self { letter: self.letter, digit: self.digit + 1 };
    }
    if self.letter + 1 < LETTERS {
      return Self { letter: self.letter + 1, digit: 1 };
    }
    Self::FIRST
  }
}

impl fmt::Display for TicketNumber {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.letter(), self.digit)
  }
}

impl FromStr for TicketNumber {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || Error::InvalidTicketNumber(s.to_owned());
    let mut chars = s.chars();
    let letter = chars.next().ok_or_else(invalid)?;
    let digits = chars.as_str();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
      return Err(invalid());
    }
    let digit: u8 = digits.parse().map_err(|_| invalid())?;
    Self::new(letter, digit).ok_or_else(invalid)
  }
}

impl TryFrom<String> for TicketNumber {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<TicketNumber> for String {
  fn from(n: TicketNumber) -> Self { n.to_string() }
}

/// Compute the next code from the codes already issued today.
///
/// Malformed codes are ignored. With no valid codes the result is `A1`.
pub fn next_ticket_number<'a, I>(issued: I) -> TicketNumber
where
  I: IntoIterator<Item = &'a str>,
{
  issued
    .into_iter()
    .filter_map(|code| code.parse::<TicketNumber>().ok())
    .max_by_key(|n| n.ordinal())
    .map_or(TicketNumber::FIRST, TicketNumber::successor)
}
