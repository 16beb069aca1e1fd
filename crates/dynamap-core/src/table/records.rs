use crate::{
    error::{Error, ErrorClass, ErrorOrigin},
    record::Record,
    store::RowStream,
    table::Table,
};
use std::fmt;

///
/// Records
///
/// Lazy, single-pass sequence of records read from a query or scan.
/// Further store round trips happen only as the sequence is consumed;
/// dropping it is the only cancellation.
///

pub struct Records {
    table: Table,
    rows: RowStream,
    projected: bool,
}

impl Records {
    pub(crate) fn new(table: Table, rows: RowStream, projected: bool) -> Self {
        Self {
            table,
            rows,
            projected,
        }
    }

    #[must_use]
    pub const fn table(&self) -> &Table {
        &self.table
    }
}

impl Iterator for Records {
    type Item = Result<Record, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        let row = self.rows.next()?;

        Some(
            row.map(|row| {
                if self.projected {
                    Record::projected(self.table.clone(), row)
                } else {
                    Record::from_parts(self.table.clone(), row, false)
                }
            })
            .map_err(Error::from),
        )
    }
}

impl fmt::Debug for Records {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Records")
            .field("table", &self.table.name())
            .finish_non_exhaustive()
    }
}

///
/// Fetched
///
/// Result of [`Table::get`]: one record, or the lazy matches of a hash-only
/// lookup on a table that also has a range key.
///

#[derive(Debug)]
pub enum Fetched {
    Record(Record),
    Matches(Records),
}

impl Fetched {
    /// Unwrap the single record; a hash-only lookup on a ranged table is a
    /// validation error.
    pub fn into_record(self) -> Result<Record, Error> {
        match self {
            Self::Record(record) => Ok(record),
            Self::Matches(matches) => Err(Error::new(
                ErrorClass::Validation,
                ErrorOrigin::Table,
                format!(
                    "table '{}' has a range key; lookup by hash key alone yields many rows",
                    matches.table().name()
                ),
            )),
        }
    }

    #[must_use]
    pub fn into_matches(self) -> Option<Records> {
        match self {
            Self::Matches(matches) => Some(matches),
            Self::Record(_) => None,
        }
    }

    #[must_use]
    pub const fn is_record(&self) -> bool {
        matches!(self, Self::Record(_))
    }
}
