use clap::ValueEnum;

/// Language used for participant names and report headers.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Locale {
    #[default]
    #[value(name = "he")]
    Hebrew,
    #[value(name = "en")]
    English,
}

impl Locale {
    pub fn no_sessions(self) -> &'static str {
        match self {
            Locale::Hebrew => "לא היו אימונים בשבוע זה",
            Locale::English => "No sessions this week",
        }
    }

    pub fn weekly_headers(self) -> [&'static str; 2] {
        match self {
            Locale::Hebrew => ["שבוע", "משתתפים"],
            Locale::English => ["Week", "Participants"],
        }
    }

    pub fn participation_headers(self) -> [&'static str; 2] {
        match self {
            Locale::Hebrew => ["שם", "אחוז השתתפות"],
            Locale::English => ["Name", "Participation"],
        }
    }

    pub fn round_headers(self) -> [&'static str; 5] {
        match self {
            Locale::Hebrew => ["שם הסיבוב", "תאריך", "שעה", "DB ID", "משתתפים"],
            Locale::English => ["Round", "Date", "Time", "DB ID", "Participants"],
        }
    }
}
