use std::fmt;

/// A single spreadsheet cell after loading.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Text(String),
    Number(f64),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Text form used for key and name columns. Whole numbers drop the
    /// fractional part so a numeric `gfh` of 1234 reads as "1234".
    pub fn as_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => Some(format!("{}", *n as i64)),
            Value::Number(n) => Some(n.to_string()),
        }
    }

    /// Numeric form used for quantity and price columns. A lone comma is read
    /// as the decimal separator ("1,25"). `Err` carries the offending text.
    pub fn as_number(&self) -> std::result::Result<Option<f64>, String> {
        match self {
            Value::Null => Ok(None),
            Value::Number(n) => Ok(Some(*n)),
            Value::Text(s) => {
                let t = s.trim();
                let normalized = if !t.contains('.') && t.matches(',').count() == 1 {
                    t.replace(',', ".")
                } else {
                    t.to_string()
                };
                match normalized.parse::<f64>() {
                    Ok(n) if n.is_finite() => Ok(Some(n)),
                    _ => Err(s.clone()),
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Entry,
    Exit,
}

impl Direction {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "E" => Some(Self::Entry),
            "S" => Some(Self::Exit),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::Entry => "E",
            Self::Exit => "S",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Uh,
    Ex,
    Dis,
    Es,
    Imp,
}

/// Detail rows are emitted in this order.
pub const ALL_CHANNELS: &[Channel] = &[Channel::Uh, Channel::Ex, Channel::Dis, Channel::Es, Channel::Imp];

impl Channel {
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Uh => "uh",
            Self::Ex => "ex",
            Self::Dis => "dis",
            Self::Es => "es",
            Self::Imp => "imp",
        }
    }

    pub fn column(&self, field: &str) -> String {
        format!("{field}_{}", self.tag())
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Unit {
    pub tipo: Option<String>,
    pub denominacion: Option<String>,
    pub gfh: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Product {
    pub espec: Option<String>,
    pub nombre: Option<String>,
}

/// Quantity and prices for one channel of one movement. Absent source
/// columns stay `None`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChannelFigures {
    pub unidades: Option<f64>,
    pub pml: Option<f64>,
    pub pmf: Option<f64>,
    pub pvl: Option<f64>,
    pub pvp: Option<f64>,
    pub pvf: Option<f64>,
}

impl ChannelFigures {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailRow {
    pub movimiento_id: i64,
    pub channel: Channel,
    pub figures: ChannelFigures,
}
