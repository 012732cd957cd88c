use crate::errors::AppError;
use crate::models::CleanedContact;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use std::collections::HashMap;
use std::path::Path;

/// How many email/phone column pairs a cleaned export carries.
const CANDIDATE_COLUMNS: usize = 10;

/// Contact details keyed by (first name, last name).
pub type CleanedContacts = HashMap<(String, String), CleanedContact>;

/// Reads a hand-cleaned contact export and keeps only values the
/// cleaning service marked confident enough.
///
/// Each row carries up to ten candidate emails and ten candidate
/// phones, each with its own confidence column ("85%"). For every
/// person the first candidate whose confidence is strictly above
/// `required_confidence` wins; phones are normalized to E.164 along
/// the way and dropped if they do not parse as US numbers.
pub fn extract_cleaned(
    csv_path: impl AsRef<Path>,
    required_confidence: u32,
) -> Result<CleanedContacts, AppError> {
    let path = csv_path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| {
        AppError::InvalidInput(format!("Cannot open cleaned export {}: {}", path.display(), e))
    })?;

    extract_from(csv::Reader::from_reader(file), required_confidence)
}

fn extract_from<R: std::io::Read>(
    mut reader: csv::Reader<R>,
    required_confidence: u32,
) -> Result<CleanedContacts, AppError> {
    let headers = reader
        .headers()
        .map_err(|e| AppError::InvalidInput(format!("Cleaned export has no header row: {}", e)))?
        .clone();

    let column = |name: String| -> Result<usize, AppError> {
        headers
            .iter()
            .position(|header| header == name)
            .ok_or_else(|| {
                AppError::InvalidInput(format!("Cleaned export missing column '{}'", name))
            })
    };

    let first_col = column("First Name".to_string())?;
    let last_col = column("Last Name".to_string())?;

    // (value column, confidence column) pairs, in candidate order.
    let mut email_cols = Vec::with_capacity(CANDIDATE_COLUMNS);
    let mut phone_cols = Vec::with_capacity(CANDIDATE_COLUMNS);
    for i in 1..=CANDIDATE_COLUMNS {
        email_cols.push((
            column(format!("Email {}", i))?,
            column(format!("Email {} Total AI", i))?,
        ));
        phone_cols.push((
            column(format!("Contact Phone {}", i))?,
            column(format!("Contact Phone {} Total AI", i))?,
        ));
    }

    let mut cleaned = CleanedContacts::new();

    for record in reader.records() {
        let record = record.map_err(|e| {
            AppError::InvalidInput(format!("Malformed row in cleaned export: {}", e))
        })?;

        let first = record.get(first_col).unwrap_or("").trim();
        let last = record.get(last_col).unwrap_or("").trim();
        if first.is_empty() && last.is_empty() {
            continue;
        }

        let email = first_confident(&record, &email_cols, required_confidence, |value| {
            Some(value.to_string())
        });
        let phone = first_confident(&record, &phone_cols, required_confidence, normalize_us_phone);

        if email.is_none() && phone.is_none() {
            continue;
        }

        let entry = cleaned
            .entry((first.to_string(), last.to_string()))
            .or_default();
        if entry.email.is_none() {
            entry.email = email;
        }
        if entry.phone.is_none() {
            entry.phone = phone;
        }
    }

    Ok(cleaned)
}

/// Scans candidate columns in order and returns the first value that
/// clears the confidence bar and survives `accept`.
fn first_confident<T>(
    record: &csv::StringRecord,
    columns: &[(usize, usize)],
    required_confidence: u32,
    accept: impl Fn(&str) -> Option<T>,
) -> Option<T> {
    columns.iter().find_map(|&(value_col, confidence_col)| {
        let value = record.get(value_col)?.trim();
        if value.is_empty() {
            return None;
        }
        let confidence = parse_confidence(record.get(confidence_col)?)?;
        if confidence > required_confidence {
            accept(value)
        } else {
            None
        }
    })
}

/// Confidence cells read like "85%". Anything unparseable counts as no
/// confidence at all.
fn parse_confidence(cell: &str) -> Option<u32> {
    cell.trim().trim_end_matches('%').trim().parse().ok()
}

/// Validates a US phone number and normalizes it to E.164.
pub fn normalize_us_phone(raw: &str) -> Option<String> {
    match phonenumber::parse(Some(CountryId::US), raw) {
        Ok(number) => {
            if phonenumber::is_valid(&number) {
                Some(number.format().mode(Mode::E164).to_string())
            } else {
                tracing::warn!("Dropping invalid US phone number: {}", raw);
                None
            }
        }
        Err(e) => {
            tracing::warn!("Could not parse phone number '{}': {}", raw, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> String {
        let mut cols = vec!["First Name".to_string(), "Last Name".to_string()];
        for i in 1..=CANDIDATE_COLUMNS {
            cols.push(format!("Email {}", i));
            cols.push(format!("Email {} Total AI", i));
            cols.push(format!("Contact Phone {}", i));
            cols.push(format!("Contact Phone {} Total AI", i));
        }
        cols.join(",")
    }

    /// Builds a row matching `header()`, with candidate values placed
    /// at their 1-based slot.
    fn row(
        first: &str,
        last: &str,
        emails: &[(usize, &str, &str)],
        phones: &[(usize, &str, &str)],
    ) -> String {
        let mut fields = vec![first.to_string(), last.to_string()];
        for i in 1..=CANDIDATE_COLUMNS {
            let email = emails.iter().find(|(slot, _, _)| *slot == i);
            fields.push(email.map(|(_, value, _)| value.to_string()).unwrap_or_default());
            fields.push(email.map(|(_, _, conf)| conf.to_string()).unwrap_or_default());

            let phone = phones.iter().find(|(slot, _, _)| *slot == i);
            fields.push(phone.map(|(_, value, _)| value.to_string()).unwrap_or_default());
            fields.push(phone.map(|(_, _, conf)| conf.to_string()).unwrap_or_default());
        }
        fields.join(",")
    }

    fn parse(csv_text: &str, required_confidence: u32) -> CleanedContacts {
        extract_from(
            csv::Reader::from_reader(csv_text.as_bytes()),
            required_confidence,
        )
        .unwrap()
    }

    fn key(first: &str, last: &str) -> (String, String) {
        (first.to_string(), last.to_string())
    }

    #[test]
    fn first_candidate_above_threshold_wins() {
        let csv_text = format!(
            "{}\n{}\n",
            header(),
            row(
                "Chuck",
                "Bloodworth",
                &[(1, "low@conf.com", "60%"), (2, "cbloodworth@1path.com", "85%")],
                &[],
            )
        );

        let cleaned = parse(&csv_text, 70);
        let contact = &cleaned[&key("Chuck", "Bloodworth")];
        assert_eq!(contact.email.as_deref(), Some("cbloodworth@1path.com"));
        assert_eq!(contact.phone, None);
    }

    #[test]
    fn threshold_is_strictly_greater() {
        let csv_text = format!(
            "{}\n{}\n",
            header(),
            row("Ann", "Exact", &[(1, "ann@exact.com", "70%")], &[])
        );
        assert!(parse(&csv_text, 70).is_empty());
    }

    #[test]
    fn phones_come_back_in_e164() {
        let csv_text = format!(
            "{}\n{}\n",
            header(),
            row("Pat", "Dialer", &[], &[(1, "650-253-0000", "90%")])
        );

        let cleaned = parse(&csv_text, 70);
        assert_eq!(
            cleaned[&key("Pat", "Dialer")].phone.as_deref(),
            Some("+16502530000")
        );
    }

    #[test]
    fn unparseable_phone_falls_through_to_next_candidate() {
        let csv_text = format!(
            "{}\n{}\n",
            header(),
            row(
                "Pat",
                "Dialer",
                &[],
                &[(1, "not a phone", "95%"), (2, "650-253-0000", "90%")],
            )
        );

        let cleaned = parse(&csv_text, 70);
        assert_eq!(
            cleaned[&key("Pat", "Dialer")].phone.as_deref(),
            Some("+16502530000")
        );
    }

    #[test]
    fn repeated_names_fill_in_missing_fields_only() {
        let csv_text = format!(
            "{}\n{}\n{}\n",
            header(),
            row("Sam", "Twice", &[(1, "first@win.com", "80%")], &[]),
            row(
                "Sam",
                "Twice",
                &[(1, "second@loses.com", "99%")],
                &[(1, "650-253-0000", "99%")],
            )
        );

        let cleaned = parse(&csv_text, 70);
        let contact = &cleaned[&key("Sam", "Twice")];
        assert_eq!(contact.email.as_deref(), Some("first@win.com"));
        assert_eq!(contact.phone.as_deref(), Some("+16502530000"));
    }

    #[test]
    fn garbage_confidence_means_not_confident() {
        let csv_text = format!(
            "{}\n{}\n",
            header(),
            row("No", "Conf", &[(1, "x@y.com", "high")], &[])
        );
        assert!(parse(&csv_text, 0).is_empty());
    }

    #[test]
    fn missing_candidate_column_is_rejected() {
        let csv_text = "First Name,Last Name,Email 1,Email 1 Total AI\nA,B,x@y.com,90%\n";
        let err = extract_from(csv::Reader::from_reader(csv_text.as_bytes()), 70).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn normalize_rejects_nonsense() {
        assert_eq!(normalize_us_phone("not a phone"), None);
        assert_eq!(normalize_us_phone("650-253-0000").as_deref(), Some("+16502530000"));
    }
}
