//! Argument groups shared by several subcommands.

use chrono::Utc;
use clap::Args;
use wayfind_core::{
    Amenities, Coordinate, DiscoveryCriteria, FilterCriteria, SortKey, UserLocation,
};

/// A fixed device position standing in for a live sensor.
#[derive(Debug, Clone, Default, Args)]
pub(crate) struct LocationArgs {
    /// Latitude of the caller
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    pub(crate) lat: Option<f64>,
    /// Longitude of the caller
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    pub(crate) lng: Option<f64>,
}

impl LocationArgs {
    pub(crate) fn user_location(&self) -> anyhow::Result<Option<UserLocation>> {
        match (self.lat, self.lng) {
            (Some(lat), Some(lng)) => {
                let coordinate = Coordinate::new(lat, lng)?;
                Ok(Some(UserLocation::new(coordinate, None, Utc::now())))
            }
            _ => Ok(None),
        }
    }
}

#[derive(Debug, Clone, Args)]
pub(crate) struct CriteriaArgs {
    /// Sort order: distance, rating or name
    #[arg(long, default_value_t = SortKey::Distance)]
    pub(crate) sort: SortKey,
    /// Minimum average rating, 0 to 5
    #[arg(long, default_value_t = 0.0)]
    pub(crate) min_rating: f64,
    /// Only wheelchair-accessible facilities
    #[arg(long)]
    pub(crate) wheelchair: bool,
    /// Only facilities with changing tables
    #[arg(long)]
    pub(crate) changing_tables: bool,
    /// Case-insensitive match on name or description
    #[arg(long, default_value = "")]
    pub(crate) search: String,
}

impl CriteriaArgs {
    pub(crate) fn to_criteria(&self) -> anyhow::Result<DiscoveryCriteria> {
        Ok(DiscoveryCriteria {
            filters: FilterCriteria::new(self.min_rating, self.wheelchair, self.changing_tables)?,
            sort_key: self.sort,
            search_text: self.search.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, Args)]
#[allow(clippy::struct_excessive_bools)]
pub(crate) struct AmenityArgs {
    #[arg(long)]
    pub(crate) wheelchair_accessible: bool,
    #[arg(long)]
    pub(crate) changing_tables: bool,
    #[arg(long)]
    pub(crate) gender_neutral: bool,
    #[arg(long)]
    pub(crate) requires_key: bool,
}

impl From<AmenityArgs> for Amenities {
    fn from(args: AmenityArgs) -> Self {
        Self {
            wheelchair_accessible: args.wheelchair_accessible,
            has_changing_tables: args.changing_tables,
            gender_neutral: args.gender_neutral,
            requires_key: args.requires_key,
        }
    }
}
