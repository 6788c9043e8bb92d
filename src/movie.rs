use aws_sdk_dynamodb::types;
use serde::{Deserialize, Serialize};
use serde_dynamo::{Error, Result, to_attribute_value};
use std::collections;

/// The name of the attribute holding a movie's release year, the table's
/// partition key.
pub const PARTITION_KEY: &str = "year";

/// The name of the attribute holding a movie's title, the table's sort key.
pub const SORT_KEY: &str = "title";

/// A movie record stored in the catalog table.
///
/// ```rust
/// use dynamodb_movies::movie;
///
/// let movie = movie::Movie {
///     info: movie::Info {
///         plot: Some("Nothing happens at all.".to_string()),
///         rating: Some(3.5),
///     },
///     title: "The Big New Movie".to_string(),
///     year: 2015,
/// };
/// ```
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Movie {
    /// The additional attributes of the movie.
    #[serde(default)]
    pub info: Info,
    /// The title of the movie.
    pub title: String,
    /// The release year of the movie.
    pub year: i32,
}

impl Movie {
    /// Return the primary key of the movie.
    pub fn key(&self) -> MovieKey {
        MovieKey {
            title: self.title.clone(),
            year: self.year,
        }
    }
}

/// The `info` attribute bag of a movie.
///
/// Both fields are optional: scans and PartiQL listings project a subset of
/// attributes, and absent fields are omitted when a movie is stored.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Info {
    /// The plot summary of the movie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plot: Option<String>,
    /// The average viewer rating of the movie.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

/// Composite primary key of a movie (release year and title).
///
/// ```rust
/// use dynamodb_movies::movie;
///
/// let key = movie::MovieKey {
///     title: "The Big New Movie".to_string(),
///     year: 2015,
/// };
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieKey {
    /// The title of the movie.
    pub title: String,
    /// The release year of the movie.
    pub year: i32,
}

impl TryFrom<MovieKey> for collections::HashMap<String, types::AttributeValue> {
    type Error = Error;

    fn try_from(key: MovieKey) -> Result<Self> {
        let year = to_attribute_value(key.year)?;
        let title = to_attribute_value(key.title)?;
        Ok(Self::from([
            (PARTITION_KEY.to_string(), year),
            (SORT_KEY.to_string(), title),
        ]))
    }
}

/// Catalog listing projection (title and rating).
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct MovieSummary {
    /// The projected attributes of the movie, carrying only the rating.
    #[serde(default)]
    pub info: Info,
    /// The title of the movie.
    pub title: String,
}

/// A rating change to apply to one movie.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RatingUpdate {
    /// The primary key of the movie to update.
    pub key: MovieKey,
    /// The new value of the movie's rating.
    pub rating: f64,
}
