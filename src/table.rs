use crate::{batch, error, movie};

use aws_sdk_dynamodb::{Client, client::Waiters, types};
use serde::Deserialize;
use serde_dynamo::{Error, Result, from_item, from_items, to_attribute_value, to_item};
use std::{collections, time};

/// How long to wait for a created table to become active.
const CREATE_TABLE_WAIT: time::Duration = time::Duration::from_secs(300);

/// marshaled inputs of the update movie operation
#[derive(Debug, PartialEq)]
struct UpdateArguments {
    key: collections::HashMap<String, types::AttributeValue>,
    plot: types::AttributeValue,
    rating: types::AttributeValue,
}

impl TryFrom<movie::Movie> for UpdateArguments {
    type Error = Error;

    fn try_from(movie: movie::Movie) -> Result<Self> {
        let key = movie.key().try_into()?;
        let rating = to_attribute_value(movie.info.rating)?;
        let plot = to_attribute_value(movie.info.plot)?;
        Ok(Self { key, plot, rating })
    }
}

/// updated attributes returned by the update movie operation
#[derive(Debug, Default, Deserialize, PartialEq)]
struct UpdatedAttributes {
    #[serde(default)]
    info: movie::Info,
}

/// A movie catalog table and the operations it supports.
///
/// Every operation borrows the [`Client`] the caller constructed.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_movies::{movie, table};
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let movies = table::MovieTable {
///     table_name: "doc-example-table-movies".to_string(),
/// };
/// let movie = movie::Movie {
///     info: movie::Info {
///         plot: Some("Nothing happens at all.".to_string()),
///         rating: Some(3.5),
///     },
///     title: "The Big New Movie".to_string(),
///     year: 2015,
/// };
/// movies.add_movie(client, movie.clone()).await?;
/// let found = movies.get_movie(client, movie.key()).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MovieTable {
    /// The name of the backing DynamoDB table.
    pub table_name: String,
}

impl MovieTable {
    /// Check whether the backing table exists.
    pub async fn exists(&self, client: &Client) -> error::Result<bool> {
        match client
            .describe_table()
            .table_name(&self.table_name)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(error) => match aws_sdk_dynamodb::Error::from(error) {
                aws_sdk_dynamodb::Error::ResourceNotFoundException(_) => Ok(false),
                error => Err(error::Error::Dynamo(error)),
            },
        }
    }

    /// Create the backing table and wait for it to become active.
    ///
    /// The partition key is the movie's release year and the sort key is its
    /// title. Waits up to five minutes before giving up on the new table.
    pub async fn create(
        &self,
        client: &Client,
    ) -> error::Result<Option<types::TableDescription>> {
        let response = client
            .create_table()
            .table_name(&self.table_name)
            .attribute_definitions(
                types::AttributeDefinition::builder()
                    .attribute_name(movie::PARTITION_KEY)
                    .attribute_type(types::ScalarAttributeType::N)
                    .build()
                    .unwrap(),
            )
            .attribute_definitions(
                types::AttributeDefinition::builder()
                    .attribute_name(movie::SORT_KEY)
                    .attribute_type(types::ScalarAttributeType::S)
                    .build()
                    .unwrap(),
            )
            .key_schema(
                types::KeySchemaElement::builder()
                    .attribute_name(movie::PARTITION_KEY)
                    .key_type(types::KeyType::Hash)
                    .build()
                    .unwrap(),
            )
            .key_schema(
                types::KeySchemaElement::builder()
                    .attribute_name(movie::SORT_KEY)
                    .key_type(types::KeyType::Range)
                    .build()
                    .unwrap(),
            )
            .provisioned_throughput(
                types::ProvisionedThroughput::builder()
                    .read_capacity_units(10)
                    .write_capacity_units(10)
                    .build()
                    .unwrap(),
            )
            .send()
            .await?;
        client
            .wait_until_table_exists()
            .table_name(&self.table_name)
            .wait(CREATE_TABLE_WAIT)
            .await
            .map_err(|error| error::Error::TableWait(error.into()))?;
        Ok(response.table_description)
    }

    /// Delete the backing table.
    pub async fn delete_table(&self, client: &Client) -> error::Result<()> {
        client
            .delete_table()
            .table_name(&self.table_name)
            .send()
            .await?;
        Ok(())
    }

    /// Add a movie to the table, replacing any existing record with the same
    /// key.
    pub async fn add_movie(&self, client: &Client, movie: movie::Movie) -> error::Result<()> {
        let item = to_item(movie)?;
        client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await?;
        Ok(())
    }

    /// Get a movie by its primary key.
    ///
    /// Returns `None` when no record with the given key exists.
    pub async fn get_movie(
        &self,
        client: &Client,
        key: movie::MovieKey,
    ) -> error::Result<Option<movie::Movie>> {
        let response = client
            .get_item()
            .table_name(&self.table_name)
            .set_key(Some(key.try_into()?))
            .send()
            .await?;
        match response.item {
            Some(item) => {
                let movie = from_item(item)?;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }

    /// Overwrite the rating and plot of a movie.
    ///
    /// Returns the updated attributes as stored by the service.
    pub async fn update_movie(
        &self,
        client: &Client,
        movie: movie::Movie,
    ) -> error::Result<movie::Info> {
        let arguments = UpdateArguments::try_from(movie)?;
        let response = client
            .update_item()
            .table_name(&self.table_name)
            .set_key(Some(arguments.key))
            .update_expression("SET #info.#rating = :rating, #info.#plot = :plot")
            .expression_attribute_names("#info", "info")
            .expression_attribute_names("#rating", "rating")
            .expression_attribute_names("#plot", "plot")
            .expression_attribute_values(":rating", arguments.rating)
            .expression_attribute_values(":plot", arguments.plot)
            .return_values(types::ReturnValue::UpdatedNew)
            .send()
            .await?;
        match response.attributes {
            Some(attributes) => {
                let updated: UpdatedAttributes = from_item(attributes)?;
                Ok(updated.info)
            }
            None => Ok(movie::Info::default()),
        }
    }

    /// Delete a movie by its primary key.
    pub async fn delete_movie(
        &self,
        client: &Client,
        key: movie::MovieKey,
    ) -> error::Result<()> {
        client
            .delete_item()
            .table_name(&self.table_name)
            .set_key(Some(key.try_into()?))
            .send()
            .await?;
        Ok(())
    }

    /// Query every movie released in the given year.
    pub async fn query(
        &self,
        client: &Client,
        release_year: i32,
    ) -> error::Result<Vec<movie::Movie>> {
        let year = to_attribute_value(release_year)?;
        // "year" is a DynamoDB reserved word, so expressions reach it through
        // a name placeholder.
        let mut paginator = client
            .query()
            .table_name(&self.table_name)
            .key_condition_expression("#year = :year")
            .expression_attribute_names("#year", movie::PARTITION_KEY)
            .expression_attribute_values(":year", year)
            .into_paginator()
            .send();
        let mut movies = Vec::new();
        while let Some(page) = paginator.next().await {
            let items = page?.items.unwrap_or_default();
            let mut page_movies = from_items(items)?;
            movies.append(&mut page_movies);
        }
        Ok(movies)
    }

    /// Scan for movies released between two years, projecting each movie's
    /// year, title, and rating.
    pub async fn scan(
        &self,
        client: &Client,
        start_year: i32,
        end_year: i32,
    ) -> error::Result<Vec<movie::Movie>> {
        let start_year = to_attribute_value(start_year)?;
        let end_year = to_attribute_value(end_year)?;
        let mut paginator = client
            .scan()
            .table_name(&self.table_name)
            .filter_expression("#year BETWEEN :start_year AND :end_year")
            .projection_expression("#year, #title, #info.#rating")
            .expression_attribute_names("#year", movie::PARTITION_KEY)
            .expression_attribute_names("#title", movie::SORT_KEY)
            .expression_attribute_names("#info", "info")
            .expression_attribute_names("#rating", "rating")
            .expression_attribute_values(":start_year", start_year)
            .expression_attribute_values(":end_year", end_year)
            .into_paginator()
            .send();
        let mut movies = Vec::new();
        while let Some(page) = paginator.next().await {
            let items = page?.items.unwrap_or_default();
            let mut page_movies = from_items(items)?;
            movies.append(&mut page_movies);
        }
        Ok(movies)
    }

    /// Add a batch of movies, at most `max_records` of them, issuing one
    /// batch write call per chunk of [`batch::MAX_BATCH_OPERATIONS`] records.
    ///
    /// Movies that fail to serialize are logged and skipped. Processing stops
    /// at the first failed chunk call and the error carries the number of
    /// records already written. Requests the service reports as unprocessed
    /// are logged, never resubmitted.
    ///
    /// ```rust,no_run
    /// use aws_sdk_dynamodb::Client;
    /// use dynamodb_movies::{movie, table};
    ///
    /// # async fn example(client: &Client, movies: Vec<movie::Movie>) -> Result<(), Box<dyn std::error::Error>> {
    /// let table = table::MovieTable {
    ///     table_name: "doc-example-table-movies".to_string(),
    /// };
    /// let written = table.add_movies(client, movies, Some(30)).await?;
    /// # Ok(())
    /// # }
    /// ```
    #[tracing::instrument(name = "dynamodb_movies.add_movies", err)]
    pub async fn add_movies(
        &self,
        client: &Client,
        movies: Vec<movie::Movie>,
        max_records: Option<usize>,
    ) -> error::Result<usize> {
        let mut written = 0;
        for chunk in batch::chunks(movies, max_records) {
            let requests = batch::to_requests(chunk, batch::put_request);
            if requests.is_empty() {
                continue;
            }
            let submitted = requests.len();
            let request_items = collections::HashMap::from([(self.table_name.clone(), requests)]);
            let response = client
                .batch_write_item()
                .set_request_items(Some(request_items))
                .send()
                .await
                .map_err(|error| error::Error::Batch {
                    written,
                    source: error.into(),
                })?;
            written += submitted;
            if let Some(unprocessed) = response
                .unprocessed_items
                .as_ref()
                .filter(|unprocessed| !unprocessed.is_empty())
            {
                tracing::warn!(
                    unprocessed = unprocessed.values().map(Vec::len).sum::<usize>(),
                    "batch write left unprocessed requests"
                );
            }
        }
        Ok(written)
    }
}

/// List the names of every table in the current account and region.
pub async fn list_tables(client: &Client) -> error::Result<Vec<String>> {
    let mut paginator = client.list_tables().into_paginator().send();
    let mut table_names = Vec::new();
    while let Some(page) = paginator.next().await {
        table_names.extend(page?.table_names.unwrap_or_default());
    }
    Ok(table_names)
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;

    #[rstest]
    fn test_add_movies_request_chunks() {
        let movies = (0..30)
            .map(|index| movie::Movie {
                info: movie::Info {
                    plot: Some(format!("Plot {index}")),
                    rating: Some(5.0),
                },
                title: format!("Movie {index}"),
                year: 2000 + index,
            })
            .collect::<Vec<_>>();
        let requests = batch::chunks(movies, Some(30))
            .into_iter()
            .map(|chunk| batch::to_requests(chunk, batch::put_request))
            .collect::<Vec<_>>();
        let sizes = requests.iter().map(Vec::len).collect::<Vec<_>>();
        assert_eq!(sizes, vec![25, 5]);
        assert_eq!(requests.iter().map(Vec::len).sum::<usize>(), 30);
    }

    #[rstest]
    fn test_update_arguments() {
        let movie = movie::Movie {
            info: movie::Info {
                plot: Some("Everything happens all at once.".to_string()),
                rating: Some(6.5),
            },
            title: "The Big New Movie".to_string(),
            year: 2015,
        };
        let actual: UpdateArguments = movie.try_into().unwrap();
        let expected = UpdateArguments {
            key: collections::HashMap::from([
                (
                    "year".to_string(),
                    types::AttributeValue::N("2015".to_string()),
                ),
                (
                    "title".to_string(),
                    types::AttributeValue::S("The Big New Movie".to_string()),
                ),
            ]),
            plot: types::AttributeValue::S("Everything happens all at once.".to_string()),
            rating: types::AttributeValue::N("6.5".to_string()),
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_updated_attributes_decoding() {
        let attributes = collections::HashMap::from([(
            "info".to_string(),
            types::AttributeValue::M(collections::HashMap::from([
                (
                    "plot".to_string(),
                    types::AttributeValue::S("Everything happens all at once.".to_string()),
                ),
                (
                    "rating".to_string(),
                    types::AttributeValue::N("6.5".to_string()),
                ),
            ])),
        )]);
        let actual: UpdatedAttributes = from_item(attributes).unwrap();
        let expected = UpdatedAttributes {
            info: movie::Info {
                plot: Some("Everything happens all at once.".to_string()),
                rating: Some(6.5),
            },
        };
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_scan_projection_decoding() {
        let item = collections::HashMap::from([
            (
                "year".to_string(),
                types::AttributeValue::N("2015".to_string()),
            ),
            (
                "title".to_string(),
                types::AttributeValue::S("The Big New Movie".to_string()),
            ),
            (
                "info".to_string(),
                types::AttributeValue::M(collections::HashMap::from([(
                    "rating".to_string(),
                    types::AttributeValue::N("5.5".to_string()),
                )])),
            ),
        ]);
        let actual: movie::Movie = from_item(item).unwrap();
        let expected = movie::Movie {
            info: movie::Info {
                plot: None,
                rating: Some(5.5),
            },
            title: "The Big New Movie".to_string(),
            year: 2015,
        };
        assert_eq!(actual, expected);
    }
}
