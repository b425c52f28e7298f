use std::fmt;

/// Inclusive calendar-month window, June to September by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Season {
    start_month: u32,
    end_month: u32,
}

#[derive(Debug, PartialEq, Eq)]
pub struct SeasonParseError {
    start_month: u32,
    end_month: u32,
}

impl fmt::Display for SeasonParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "invalid season {}..={}: months must be in 1..=12 and start <= end",
            self.start_month, self.end_month
        )
    }
}

impl std::error::Error for SeasonParseError {}

impl Season {
    pub fn new(start_month: u32, end_month: u32) -> Result<Self, SeasonParseError> {
        let valid = (1..=12).contains(&start_month)
            && (1..=12).contains(&end_month)
            && start_month <= end_month;

        if !valid {
            return Err(SeasonParseError {
                start_month,
                end_month,
            });
        }

        Ok(Season {
            start_month,
            end_month,
        })
    }

    pub fn monsoon() -> Self {
        Season {
            start_month: 6,
            end_month: 9,
        }
    }

    pub fn start_month(&self) -> u32 {
        self.start_month
    }

    pub fn end_month(&self) -> u32 {
        self.end_month
    }

    pub fn contains_month(&self, month: u32) -> bool {
        (self.start_month..=self.end_month).contains(&month)
    }
}

impl Default for Season {
    fn default() -> Self {
        Self::monsoon()
    }
}
