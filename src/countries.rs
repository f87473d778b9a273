use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

macro_rules! nationalities {
    ($($(#[$attr:meta])* $variant:ident => ($code:literal, $name:literal)),+ $(,)?) => {
        /// Closed set of nationality codes an actor may carry.
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash)]
        pub enum Nationality {
            $($(#[$attr])* $variant,)+
        }

        impl Nationality {
            pub const ALL: &'static [Nationality] = &[$(Nationality::$variant,)+];

            pub fn as_code(self) -> &'static str {
                match self {
                    $(Nationality::$variant => $code,)+
                }
            }

            pub fn display_name(self) -> &'static str {
                match self {
                    $(Nationality::$variant => $name,)+
                }
            }

            pub fn from_code(code: &str) -> Option<Self> {
                match code {
                    $($code => Some(Nationality::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

// "UK" rather than ISO "GB" is the established code for stored rows.
nationalities! {
    UnitedStates => ("US", "United States"),
    UnitedKingdom => ("UK", "United Kingdom"),
    France => ("FR", "France"),
    Germany => ("DE", "Germany"),
    Japan => ("JP", "Japan"),
    China => ("CN", "China"),
    India => ("IN", "India"),
    #[default]
    Brazil => ("BR", "Brazil"),
    Russia => ("RU", "Russia"),
    SouthKorea => ("KR", "South Korea"),
    Italy => ("IT", "Italy"),
    Spain => ("ES", "Spain"),
    Canada => ("CA", "Canada"),
    Australia => ("AU", "Australia"),
    Mexico => ("MX", "Mexico"),
    Indonesia => ("ID", "Indonesia"),
    Turkey => ("TR", "Turkey"),
    Netherlands => ("NL", "Netherlands"),
    SaudiArabia => ("SA", "Saudi Arabia"),
    Switzerland => ("CH", "Switzerland"),
    Argentina => ("AR", "Argentina"),
    Sweden => ("SE", "Sweden"),
    Belgium => ("BE", "Belgium"),
    Austria => ("AT", "Austria"),
    Norway => ("NO", "Norway"),
    Poland => ("PL", "Poland"),
    Thailand => ("TH", "Thailand"),
    UnitedArabEmirates => ("AE", "United Arab Emirates"),
    Singapore => ("SG", "Singapore"),
    Malaysia => ("MY", "Malaysia"),
    Philippines => ("PH", "Philippines"),
    Egypt => ("EG", "Egypt"),
    Finland => ("FI", "Finland"),
    Greece => ("GR", "Greece"),
    Portugal => ("PT", "Portugal"),
    CzechRepublic => ("CZ", "Czech Republic"),
    Ireland => ("IE", "Ireland"),
    Hungary => ("HU", "Hungary"),
}

impl fmt::Display for Nationality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_code())
    }
}

impl Serialize for Nationality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_code())
    }
}

impl<'de> Deserialize<'de> for Nationality {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let code = String::deserialize(deserializer)?;
        Nationality::from_code(&code).ok_or_else(|| {
            de::Error::custom(format!("\"{code}\" is not a valid nationality code"))
        })
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct NationalityEntry {
    pub code: &'static str,
    pub name: &'static str,
}

pub fn table() -> Vec<NationalityEntry> {
    Nationality::ALL
        .iter()
        .map(|n| NationalityEntry { code: n.as_code(), name: n.display_name() })
        .collect()
}
