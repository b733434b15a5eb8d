#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Borough and health-inspection grade types.
//!
//! These are the closed enumerations shared by the filter model, the
//! warehouse query builder, and the result normalizer. Their string forms
//! match the spellings used in the NYC DOHMH restaurant inspection dataset
//! (e.g. `STATEN ISLAND` with a space).

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// One of the five NYC boroughs.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum Borough {
    /// Manhattan
    Manhattan,
    /// Brooklyn
    Brooklyn,
    /// Queens
    Queens,
    /// The Bronx
    Bronx,
    /// Staten Island. Stored as `STATEN ISLAND` in the dataset.
    #[serde(rename = "STATEN ISLAND", alias = "STATEN_ISLAND")]
    #[strum(
        to_string = "STATEN ISLAND",
        serialize = "STATEN_ISLAND",
        serialize = "STATEN-ISLAND"
    )]
    StatenIsland,
}

impl Borough {
    /// Returns the upper-case spelling used by the `boro` column.
    #[must_use]
    pub const fn warehouse_name(self) -> &'static str {
        match self {
            Self::Manhattan => "MANHATTAN",
            Self::Brooklyn => "BROOKLYN",
            Self::Queens => "QUEENS",
            Self::Bronx => "BRONX",
            Self::StatenIsland => "STATEN ISLAND",
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Manhattan,
            Self::Brooklyn,
            Self::Queens,
            Self::Bronx,
            Self::StatenIsland,
        ]
    }
}

/// Health-inspection letter grade.
///
/// Variants are declared best to worst, so the derived [`Ord`] gives
/// `A < B < C < P < Z`.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Grade {
    /// 0-13 violation points
    A,
    /// 14-27 violation points
    B,
    /// 28 or more violation points
    C,
    /// Grade pending
    P,
    /// Not yet graded
    Z,
}

impl Grade {
    /// Returns the grades that satisfy a minimum-grade filter of `self`.
    ///
    /// Only `A`, `B` and `C` have a ladder. `P` and `Z` return `None`
    /// and are never accepted as a minimum.
    #[must_use]
    pub const fn ladder(self) -> Option<&'static [Self]> {
        match self {
            Self::A => Some(&[Self::A]),
            Self::B => Some(&[Self::A, Self::B]),
            Self::C => Some(&[Self::A, Self::B, Self::C]),
            Self::P | Self::Z => None,
        }
    }

    /// Whether this grade can be used as a minimum-grade filter.
    #[must_use]
    pub const fn is_valid_minimum(self) -> bool {
        self.ladder().is_some()
    }

    /// Whether a restaurant graded `self` passes a `minimum` grade filter.
    #[must_use]
    pub fn satisfies_minimum(self, minimum: Self) -> bool {
        minimum
            .ladder()
            .is_some_and(|ladder| ladder.contains(&self))
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::C, Self::P, Self::Z]
    }
}
