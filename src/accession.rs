use std::fmt;

/// Shape of an SRA accession, judged purely from its syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessionType {
    Run,
    Project,
    Sample,
    Experiment,
    Submitter,
    Unknown,
}

impl AccessionType {
    /// Project, sample and experiment accessions name a group of runs.
    pub fn is_container(self) -> bool {
        matches!(
            self,
            AccessionType::Project | AccessionType::Sample | AccessionType::Experiment
        )
    }
}

impl fmt::Display for AccessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessionType::Run => write!(f, "run"),
            AccessionType::Project => write!(f, "project"),
            AccessionType::Sample => write!(f, "sample"),
            AccessionType::Experiment => write!(f, "experiment"),
            AccessionType::Submitter => write!(f, "submitter"),
            AccessionType::Unknown => write!(f, "unknown"),
        }
    }
}

const MIN_DIGITS: usize = 6;
const MAX_DIGITS: usize = 9;

#[derive(Debug, Clone, Copy)]
enum ScanState {
    Archive,
    Repository,
    Kind,
    Digits(AccessionType),
}

/// Classifies `token` as `[DES]R[APRSX]` followed by 6 to 9 digits.
///
/// A `.` after the digits ends the scan (it starts a file extension), so
/// `SRR000001.sra` is still a run. Anything else is `Unknown`; that is never
/// an error, the locator may still know what to do with it.
pub fn classify(token: &str) -> AccessionType {
    let mut state = ScanState::Archive;
    let mut digits = 0usize;

    for ch in token.chars() {
        state = match state {
            ScanState::Archive => match ch {
                'D' | 'E' | 'S' => ScanState::Repository,
                _ => return AccessionType::Unknown,
            },
            ScanState::Repository => match ch {
                'R' => ScanState::Kind,
                _ => return AccessionType::Unknown,
            },
            ScanState::Kind => match ch {
                'A' => ScanState::Digits(AccessionType::Submitter),
                'P' => ScanState::Digits(AccessionType::Project),
                'R' => ScanState::Digits(AccessionType::Run),
                'S' => ScanState::Digits(AccessionType::Sample),
                'X' => ScanState::Digits(AccessionType::Experiment),
                _ => return AccessionType::Unknown,
            },
            ScanState::Digits(kind) => match ch {
                '.' => break,
                '0'..='9' => {
                    digits += 1;
                    ScanState::Digits(kind)
                }
                _ => return AccessionType::Unknown,
            },
        };
    }

    match state {
        ScanState::Digits(kind) if (MIN_DIGITS..=MAX_DIGITS).contains(&digits) => kind,
        _ => AccessionType::Unknown,
    }
}
