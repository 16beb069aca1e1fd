use crate::{
    enumeration::{EnumKey, Enumeration, Member},
    error::Error,
    field::{Coercion, FieldError, ForeignRef, TypedValue},
    record::Record,
    value::Value,
};
use time::{Date, OffsetDateTime, Time};

/// Julian day number of 0001-01-01, minus one: day ordinals start at 1.
const ORDINAL_JULIAN_OFFSET: i64 = 1_721_425;

/// Proleptic Gregorian day ordinal, 0001-01-01 being day 1.
#[must_use]
pub fn date_to_ordinal(date: Date) -> i64 {
    i64::from(date.to_julian_day()) - ORDINAL_JULIAN_OFFSET
}

/// Inverse of [`date_to_ordinal`]; `None` outside the representable range.
#[must_use]
pub fn date_from_ordinal(ordinal: i64) -> Option<Date> {
    let julian = i32::try_from(ordinal.checked_add(ORDINAL_JULIAN_OFFSET)?).ok()?;

    Date::from_julian_day(julian).ok()
}

fn expect_string(wire: &Value) -> Result<&str, FieldError> {
    wire.as_str().ok_or(FieldError::WireMismatch {
        expected: "S",
        found: wire.type_name(),
    })
}

fn expect_number(wire: &Value) -> Result<i64, FieldError> {
    wire.as_number().ok_or(FieldError::WireMismatch {
        expected: "N",
        found: wire.type_name(),
    })
}

///
/// TextCoercion
///

#[derive(Clone, Copy, Debug, Default)]
pub struct TextCoercion;

impl Coercion for TextCoercion {
    fn name(&self) -> &'static str {
        "text"
    }

    fn wire_kind(&self) -> &'static str {
        "S"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        Ok(Some(TypedValue::Text(expect_string(wire)?.to_string())))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let text = match typed {
            TypedValue::Text(s) => s,
            TypedValue::Int(n) => n.to_string(),
            TypedValue::Member(m) => m.name().to_string(),
            TypedValue::Date(d) => d.to_string(),
            TypedValue::Wire(Value::S(s)) => s,
            other => return Err(FieldError::invalid("text", &other).into()),
        };

        Ok(Value::S(text))
    }
}

///
/// IntegerCoercion
///

#[derive(Clone, Copy, Debug, Default)]
pub struct IntegerCoercion;

impl Coercion for IntegerCoercion {
    fn name(&self) -> &'static str {
        "integer"
    }

    fn wire_kind(&self) -> &'static str {
        "N"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        Ok(Some(TypedValue::Int(expect_number(wire)?)))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let n = match typed {
            TypedValue::Int(n) | TypedValue::Wire(Value::N(n)) => n,
            TypedValue::Member(m) => m.ordinal().into(),
            TypedValue::Text(s) => s.trim().parse().map_err(|_| FieldError::InvalidValue {
                expected: "an integer",
                found: format!("text '{s}'"),
            })?,
            other => return Err(FieldError::invalid("an integer", &other).into()),
        };

        Ok(Value::N(n))
    }
}

/// Resolve any member-like typed value against an enumeration. Lookup
/// failures become validation errors: they surface at assignment time.
fn member_from_typed(enumeration: &'static Enumeration, typed: TypedValue) -> Result<Member, Error> {
    let lookup = match &typed {
        TypedValue::Member(m) => enumeration.get(*m),
        TypedValue::Text(s) => enumeration.get(EnumKey::Name(s)),
        TypedValue::Int(n) => enumeration.get(*n),
        TypedValue::Wire(v) => enumeration.cast(v),
        other => return Err(FieldError::invalid("an enumeration member", other).into()),
    };

    lookup.map_err(|err| {
        FieldError::InvalidValue {
            expected: "an enumeration member",
            found: err.to_string(),
        }
        .into()
    })
}

///
/// ChoiceCoercion
///
/// Stores the member name as a string.
///

#[derive(Clone, Copy, Debug)]
pub struct ChoiceCoercion {
    enumeration: &'static Enumeration,
}

impl ChoiceCoercion {
    #[must_use]
    pub const fn new(enumeration: &'static Enumeration) -> Self {
        Self { enumeration }
    }
}

impl Coercion for ChoiceCoercion {
    fn name(&self) -> &'static str {
        "choice"
    }

    fn wire_kind(&self) -> &'static str {
        "S"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        let member = self.enumeration.cast(wire)?;

        Ok(Some(TypedValue::Member(member)))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let member = member_from_typed(self.enumeration, typed)?;

        Ok(Value::S(member.name().to_string()))
    }
}

///
/// EnumCoercion
///
/// Stores the member ordinal as a number.
///

#[derive(Clone, Copy, Debug)]
pub struct EnumCoercion {
    enumeration: &'static Enumeration,
}

impl EnumCoercion {
    #[must_use]
    pub const fn new(enumeration: &'static Enumeration) -> Self {
        Self { enumeration }
    }
}

impl Coercion for EnumCoercion {
    fn name(&self) -> &'static str {
        "enum"
    }

    fn wire_kind(&self) -> &'static str {
        "N"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        let member = self.enumeration.cast(wire)?;

        Ok(Some(TypedValue::Member(member)))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let member = member_from_typed(self.enumeration, typed)?;

        Ok(Value::N(member.ordinal().into()))
    }
}

///
/// DateCoercion
///
/// Stores the day ordinal; 0 means no date.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct DateCoercion;

impl Coercion for DateCoercion {
    fn name(&self) -> &'static str {
        "date"
    }

    fn wire_kind(&self) -> &'static str {
        "N"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        let ordinal = expect_number(wire)?;
        if ordinal == 0 {
            return Ok(None);
        }

        let date = date_from_ordinal(ordinal).ok_or_else(|| FieldError::InvalidValue {
            expected: "a day ordinal within the calendar range",
            found: ordinal.to_string(),
        })?;

        Ok(Some(TypedValue::Date(date)))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let ordinal = match typed {
            TypedValue::Date(d) => date_to_ordinal(d),
            TypedValue::DateTime(dt) => date_to_ordinal(dt.date()),
            TypedValue::Int(0) => 0,
            other => return Err(FieldError::invalid("a date", &other).into()),
        };

        Ok(Value::N(ordinal))
    }
}

///
/// DateTimeCoercion
///
/// Stores whole UTC seconds since the Unix epoch; 0 means no timestamp.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct DateTimeCoercion;

impl Coercion for DateTimeCoercion {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn wire_kind(&self) -> &'static str {
        "N"
    }

    fn to_typed(&self, _: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        let secs = expect_number(wire)?;
        if secs == 0 {
            return Ok(None);
        }

        let dt = OffsetDateTime::from_unix_timestamp(secs).map_err(|e| {
            FieldError::InvalidValue {
                expected: "a unix timestamp within range",
                found: format!("{secs} ({e})"),
            }
        })?;

        Ok(Some(TypedValue::DateTime(dt)))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let secs = match typed {
            TypedValue::DateTime(dt) => dt.unix_timestamp(),
            TypedValue::Date(d) => d.with_time(Time::MIDNIGHT).assume_utc().unix_timestamp(),
            TypedValue::Int(0) => 0,
            other => return Err(FieldError::invalid("a datetime", &other).into()),
        };

        Ok(Value::N(secs))
    }
}

///
/// ForeignKeyCoercion
///
/// Stores `{"table": .., "key": ..}` JSON. Reading performs network I/O:
/// the referenced table is resolved through the record's connection and
/// the referenced row is fetched (cache first, then store). Use
/// [`Record::reference`] to decode the pointer without fetching.
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ForeignKeyCoercion;

impl Coercion for ForeignKeyCoercion {
    fn name(&self) -> &'static str {
        "foreign_key"
    }

    fn wire_kind(&self) -> &'static str {
        "S"
    }

    fn to_typed(&self, record: &Record, wire: &Value) -> Result<Option<TypedValue>, Error> {
        let reference = ForeignRef::from_json_str(expect_string(wire)?)?;
        let table = record.connection()?.table(&reference.table)?;
        let target = table.get(reference.key)?.into_record()?;

        Ok(Some(TypedValue::Record(Box::new(target))))
    }

    fn from_typed(&self, _: &Record, typed: TypedValue) -> Result<Value, Error> {
        let reference = match typed {
            TypedValue::Record(target) => ForeignRef {
                table: target.table_name().to_string(),
                key: target.key()?,
            },
            TypedValue::Reference(reference) => reference,
            other => return Err(FieldError::invalid("a record or reference", &other).into()),
        };

        Ok(Value::S(reference.to_json_string()))
    }
}
