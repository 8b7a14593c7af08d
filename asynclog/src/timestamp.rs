/// Local wall-clock time with second resolution.
///
/// Rendered in the compact `YYYYMMDDHHMMSS` form used by both record
/// prefixes and log file names.
///
/// # Examples
///
/// ```
/// use asynclog::Timestamp;
///
/// let ts = Timestamp::from_civil(jiff::civil::date(2025, 4, 17).at(9, 56, 52, 0));
/// assert_eq!(ts.to_string(), "20250417095652");
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Timestamp {
    year: i16,
    month: i8,
    day: i8,
    hour: i8,
    minute: i8,
    second: i8,
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut text = String::with_capacity(COMPACT_LEN);
        self.write_compact(&mut text);
        f.write_str(&text)
    }
}

/// Length of the compact form for years 0 through 9999.
pub const COMPACT_LEN: usize = 14;

impl Timestamp {
    /// Current time in the system time zone, falling back to UTC when the
    /// zone cannot be determined.
    pub fn now() -> Timestamp {
        Timestamp::from_civil(jiff::Zoned::now().datetime())
    }

    /// Truncates a civil date-time to whole seconds.
    pub fn from_civil(datetime: jiff::civil::DateTime) -> Timestamp {
        Timestamp {
            year: datetime.year(),
            month: datetime.month(),
            day: datetime.day(),
            hour: datetime.hour(),
            minute: datetime.minute(),
            second: datetime.second(),
        }
    }

    /// Appends `YYYYMMDDHHMMSS` to the output.
    pub fn write_compact(&self, output: &mut String) {
        if self.year < 0 {
            output.push('-');
        }
        let abs_year = self.year.unsigned_abs();
        write_2digit_number(output, (abs_year / 100) as usize);
        write_2digit_number(output, (abs_year % 100) as usize);
        write_2digit_number(output, self.month as usize);
        write_2digit_number(output, self.day as usize);
        write_2digit_number(output, self.hour as usize);
        write_2digit_number(output, self.minute as usize);
        write_2digit_number(output, self.second as usize);
    }
}

// Precomputed lookup table for formatting two decimal digits (00-99) quickly.
const DEC_DIGITS_LUT: &str = "\
    0001020304050607080910111213141516171819\
    2021222324252627282930313233343536373839\
    4041424344454647484950515253545556575859\
    6061626364656667686970717273747576777879\
    8081828384858687888990919293949596979899";

fn write_2digit_number(output: &mut String, value: usize) {
    let index = (value % 100) * 2;
    output.push_str(&DEC_DIGITS_LUT[index..index + 2]);
}
