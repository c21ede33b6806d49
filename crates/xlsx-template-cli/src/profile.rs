//! Demo variable sets: every placeholder the demo template uses, with a prompt label and a
//! default value per locale.

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use xlsx_template::{Placeholder, SubstitutionMap};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    De,
}

impl Locale {
    fn index(self) -> usize {
        match self {
            Locale::En => 0,
            Locale::De => 1,
        }
    }

    pub fn date_format(self) -> &'static str {
        match self {
            Locale::En => "%m/%d/%Y",
            Locale::De => "%d.%m.%Y",
        }
    }
}

#[derive(Debug)]
pub struct Variable {
    pub key: &'static str,
    /// `[en, de]`.
    label: [&'static str; 2],
    default: [&'static str; 2],
    /// Asked for interactively; the rest are filled from defaults.
    pub prompted: bool,
}

/// Placeholder filled with the current date.
pub const DATE_KEY: &str = "Date";

const fn var(
    key: &'static str,
    label: [&'static str; 2],
    default: [&'static str; 2],
    prompted: bool,
) -> Variable {
    Variable {
        key,
        label,
        default,
        prompted,
    }
}

pub const VARIABLES: &[Variable] = &[
    var(
        "VehicleRegistration",
        ["Vehicle Registration", "Kennzeichen"],
        ["DefaultVehicle", "Standardfahrzeug"],
        true,
    ),
    var(
        "Dashboard",
        ["Dashboard", "Armaturenbrett"],
        ["DefaultDashboard", "Standardarmaturenbrett"],
        true,
    ),
    var(
        "DefectDescription",
        ["Defect Description", "Mangelbeschreibung"],
        ["DefaultDefect", "Standardmangel"],
        true,
    ),
    var("Revenue_Q1", ["Revenue Q1", "Umsatz Q1"], ["450,000", "450.000"], true),
    var("Profit_Q1", ["Profit Q1", "Gewinn Q1"], ["85,000", "85.000"], true),
    var("Status_A", ["Status A", "Status A"], ["Completed", "Abgeschlossen"], true),
    var("Budget_A", ["Budget A", "Budget A"], ["75,000", "75.000"], true),
    var("Costs_Q1", ["Costs Q1", "Kosten Q1"], ["365,000", "365.000"], false),
    var("Margin_Q1", ["Margin Q1", "Marge Q1"], ["18.9", "18,9"], false),
    var("Revenue_Q2", ["Revenue Q2", "Umsatz Q2"], ["520,000", "520.000"], false),
    var("Profit_Q2", ["Profit Q2", "Gewinn Q2"], ["95,000", "95.000"], false),
    var("Costs_Q2", ["Costs Q2", "Kosten Q2"], ["425,000", "425.000"], false),
    var("Margin_Q2", ["Margin Q2", "Marge Q2"], ["18.3", "18,3"], false),
    var("Revenue_Q3", ["Revenue Q3", "Umsatz Q3"], ["580,000", "580.000"], false),
    var("Profit_Q3", ["Profit Q3", "Gewinn Q3"], ["110,000", "110.000"], false),
    var("Costs_Q3", ["Costs Q3", "Kosten Q3"], ["470,000", "470.000"], false),
    var("Margin_Q3", ["Margin Q3", "Marge Q3"], ["19.0", "19,0"], false),
    var("Revenue_Q4", ["Revenue Q4", "Umsatz Q4"], ["620,000", "620.000"], false),
    var("Profit_Q4", ["Profit Q4", "Gewinn Q4"], ["125,000", "125.000"], false),
    var("Costs_Q4", ["Costs Q4", "Kosten Q4"], ["495,000", "495.000"], false),
    var("Margin_Q4", ["Margin Q4", "Marge Q4"], ["20.2", "20,2"], false),
    var("Status_B", ["Status B", "Status B"], ["In Progress", "In Bearbeitung"], false),
    var("Budget_B", ["Budget B", "Budget B"], ["120,000", "120.000"], false),
    var("Status_C", ["Status C", "Status C"], ["Planned", "Geplant"], false),
    var("Budget_C", ["Budget C", "Budget C"], ["200,000", "200.000"], false),
    var(
        "CompanyName",
        ["Company Name", "Firmenname"],
        ["TechSolutions Inc", "TechSolutions GmbH"],
        false,
    ),
    var("CEO", ["CEO", "Geschäftsführer"], ["John Smith", "John Smith"], false),
    var("Location", ["Location", "Standort"], ["Munich, Germany", "München, Deutschland"], false),
    var("Employees", ["Employees", "Mitarbeiter"], ["150", "150"], false),
    var("Year", ["Year", "Jahr"], ["2025", "2025"], false),
    var(
        "Remarks",
        ["Remarks", "Bemerkungen"],
        [
            "Very successful quarter with above-average growth. New product line was successfully launched.",
            "Sehr erfolgreiches Quartal mit überdurchschnittlichem Wachstum. Neue Produktlinie wurde erfolgreich eingeführt.",
        ],
        false,
    ),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Profile {
    pub locale: Locale,
}

impl Profile {
    pub fn new(locale: Locale) -> Self {
        Self { locale }
    }

    pub fn variables(&self) -> impl Iterator<Item = &'static Variable> {
        VARIABLES.iter()
    }

    pub fn prompted(&self) -> impl Iterator<Item = &'static Variable> {
        VARIABLES.iter().filter(|var| var.prompted)
    }

    pub fn label(&self, var: &Variable) -> &'static str {
        var.label[self.locale.index()]
    }

    pub fn default_value(&self, var: &Variable) -> &'static str {
        var.default[self.locale.index()]
    }

    pub fn format_date(&self, date: NaiveDate) -> String {
        date.format(self.locale.date_format()).to_string()
    }

    /// Default for every variable plus `##Date##` set to `today`.
    pub fn defaults(&self, today: NaiveDate) -> SubstitutionMap {
        let mut map: SubstitutionMap = self
            .variables()
            .filter_map(|var| {
                Placeholder::new(var.key)
                    .ok()
                    .map(|key| (key, self.default_value(var).to_string()))
            })
            .collect();
        if let Ok(key) = Placeholder::new(DATE_KEY) {
            map.insert(key, self.format_date(today));
        }
        map
    }
}
