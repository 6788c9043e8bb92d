use crate::{batch, error, movie};

use aws_sdk_dynamodb::{Client, types};
use serde_dynamo::{Result, from_item, from_items, to_attribute_value};

/// Movie catalog operations expressed as parameterized PartiQL statements.
///
/// Single operations go through `ExecuteStatement`; batch operations go
/// through `BatchExecuteStatement`, chunked at
/// [`batch::MAX_BATCH_OPERATIONS`] statements per call.
///
/// ```rust,no_run
/// use aws_sdk_dynamodb::Client;
/// use dynamodb_movies::{movie, partiql};
///
/// # async fn example(client: &Client) -> Result<(), Box<dyn std::error::Error>> {
/// let runner = partiql::PartiQLRunner {
///     table_name: "doc-example-table-movies".to_string(),
/// };
/// let found = runner
///     .get_movie(
///         client,
///         movie::MovieKey {
///             title: "The Big New Movie".to_string(),
///             year: 2015,
///         },
///     )
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PartiQLRunner {
    /// The name of the backing DynamoDB table.
    pub table_name: String,
}

impl PartiQLRunner {
    fn insert_statement(&self) -> String {
        format!(
            "INSERT INTO \"{}\" VALUE {{'title': ?, 'year': ?, 'info': ?}}",
            self.table_name
        )
    }

    fn select_statement(&self) -> String {
        format!(
            "SELECT * FROM \"{}\" WHERE title=? AND year=?",
            self.table_name
        )
    }

    fn select_all_statement(&self) -> String {
        format!("SELECT title, info.rating FROM \"{}\"", self.table_name)
    }

    fn update_statement(&self) -> String {
        format!(
            "UPDATE \"{}\" SET info.rating=? WHERE title=? AND year=?",
            self.table_name
        )
    }

    fn delete_statement(&self) -> String {
        format!(
            "DELETE FROM \"{}\" WHERE title=? AND year=?",
            self.table_name
        )
    }

    /// Insert a movie with an `INSERT` statement.
    pub async fn add_movie(&self, client: &Client, movie: movie::Movie) -> error::Result<()> {
        let parameters = insert_parameters(movie)?;
        client
            .execute_statement()
            .statement(self.insert_statement())
            .set_parameters(Some(parameters))
            .send()
            .await?;
        Ok(())
    }

    /// Get a movie with a `SELECT` statement.
    ///
    /// Returns `None` when no record with the given key exists.
    pub async fn get_movie(
        &self,
        client: &Client,
        key: movie::MovieKey,
    ) -> error::Result<Option<movie::Movie>> {
        let parameters = key_parameters(key)?;
        let response = client
            .execute_statement()
            .statement(self.select_statement())
            .set_parameters(Some(parameters))
            .send()
            .await?;
        match response.items.unwrap_or_default().into_iter().next() {
            Some(item) => {
                let movie = from_item(item)?;
                Ok(Some(movie))
            }
            None => Ok(None),
        }
    }

    /// List the title and rating of every movie in the table, following the
    /// pagination token until the catalog is exhausted.
    pub async fn get_all_movies(
        &self,
        client: &Client,
    ) -> error::Result<Vec<movie::MovieSummary>> {
        let mut summaries = Vec::new();
        let mut next_token = None;
        loop {
            let response = client
                .execute_statement()
                .statement(self.select_all_statement())
                .set_next_token(next_token)
                .send()
                .await?;
            let items = response.items.unwrap_or_default();
            let mut page_summaries = from_items(items)?;
            summaries.append(&mut page_summaries);
            next_token = response.next_token;
            if next_token.is_none() {
                break;
            }
        }
        Ok(summaries)
    }

    /// Set the rating of a movie with an `UPDATE` statement.
    pub async fn update_movie(
        &self,
        client: &Client,
        update: movie::RatingUpdate,
    ) -> error::Result<()> {
        let parameters = update_parameters(update)?;
        client
            .execute_statement()
            .statement(self.update_statement())
            .set_parameters(Some(parameters))
            .send()
            .await?;
        Ok(())
    }

    /// Delete a movie with a `DELETE` statement.
    pub async fn delete_movie(
        &self,
        client: &Client,
        key: movie::MovieKey,
    ) -> error::Result<()> {
        let parameters = key_parameters(key)?;
        client
            .execute_statement()
            .statement(self.delete_statement())
            .set_parameters(Some(parameters))
            .send()
            .await?;
        Ok(())
    }

    /// Insert a batch of movies, one `INSERT` statement per movie.
    ///
    /// Returns the number of statements submitted; processing stops at the
    /// first failed chunk call and the error carries the partial count.
    pub async fn add_movies(
        &self,
        client: &Client,
        movies: Vec<movie::Movie>,
    ) -> error::Result<usize> {
        let statement = self.insert_statement();
        self.execute_batch(client, movies, |movie| {
            Ok(statement_request(statement.clone(), insert_parameters(movie)?))
        })
        .await
    }

    /// Get a batch of movies, one `SELECT` statement per key.
    ///
    /// Keys that match nothing are omitted from the result; statements that
    /// fail or return an undecodable item are logged and skipped.
    #[tracing::instrument(name = "dynamodb_movies.get_movies", err)]
    pub async fn get_movies(
        &self,
        client: &Client,
        keys: Vec<movie::MovieKey>,
    ) -> error::Result<Vec<movie::Movie>> {
        let statement = self.select_statement();
        let mut movies = Vec::new();
        for chunk in batch::chunks(keys, None) {
            let statements = batch::to_requests(chunk, |key| {
                Ok(statement_request(statement.clone(), key_parameters(key)?))
            });
            if statements.is_empty() {
                continue;
            }
            let response = client
                .batch_execute_statement()
                .set_statements(Some(statements))
                .send()
                .await?;
            movies.extend(collect_movies(response.responses.unwrap_or_default()));
        }
        Ok(movies)
    }

    /// Update the rating of a batch of movies, one `UPDATE` statement per
    /// record.
    ///
    /// Returns the number of statements submitted; processing stops at the
    /// first failed chunk call and the error carries the partial count.
    pub async fn update_movies(
        &self,
        client: &Client,
        updates: Vec<movie::RatingUpdate>,
    ) -> error::Result<usize> {
        let statement = self.update_statement();
        self.execute_batch(client, updates, |update| {
            Ok(statement_request(statement.clone(), update_parameters(update)?))
        })
        .await
    }

    /// Delete a batch of movies, one `DELETE` statement per key.
    ///
    /// Returns the number of statements submitted; processing stops at the
    /// first failed chunk call and the error carries the partial count.
    pub async fn delete_movies(
        &self,
        client: &Client,
        keys: Vec<movie::MovieKey>,
    ) -> error::Result<usize> {
        let statement = self.delete_statement();
        self.execute_batch(client, keys, |key| {
            Ok(statement_request(statement.clone(), key_parameters(key)?))
        })
        .await
    }

    async fn execute_batch<T>(
        &self,
        client: &Client,
        records: Vec<T>,
        to_request: impl Fn(T) -> Result<types::BatchStatementRequest>,
    ) -> error::Result<usize> {
        let mut written = 0;
        for chunk in batch::chunks(records, None) {
            let statements = batch::to_requests(chunk, &to_request);
            if statements.is_empty() {
                continue;
            }
            let submitted = statements.len();
            let response = client
                .batch_execute_statement()
                .set_statements(Some(statements))
                .send()
                .await
                .map_err(|error| error::Error::Batch {
                    written,
                    source: error.into(),
                })?;
            written += submitted;
            let failed = response
                .responses()
                .iter()
                .filter(|response| response.error.is_some())
                .count();
            if failed > 0 {
                tracing::warn!(failed, "batch call reported per-statement errors");
            }
        }
        Ok(written)
    }
}

fn statement_request(
    statement: String,
    parameters: Vec<types::AttributeValue>,
) -> types::BatchStatementRequest {
    types::BatchStatementRequest::builder()
        .statement(statement)
        .set_parameters(Some(parameters))
        .build()
        .unwrap()
}

fn insert_parameters(movie: movie::Movie) -> Result<Vec<types::AttributeValue>> {
    Ok(vec![
        to_attribute_value(movie.title)?,
        to_attribute_value(movie.year)?,
        to_attribute_value(movie.info)?,
    ])
}

fn key_parameters(key: movie::MovieKey) -> Result<Vec<types::AttributeValue>> {
    Ok(vec![
        to_attribute_value(key.title)?,
        to_attribute_value(key.year)?,
    ])
}

fn update_parameters(update: movie::RatingUpdate) -> Result<Vec<types::AttributeValue>> {
    Ok(vec![
        to_attribute_value(update.rating)?,
        to_attribute_value(update.key.title)?,
        to_attribute_value(update.key.year)?,
    ])
}

fn collect_movies(responses: Vec<types::BatchStatementResponse>) -> Vec<movie::Movie> {
    let mut movies = Vec::new();
    for response in responses {
        match (response.error, response.item) {
            (Some(error), _) => {
                tracing::warn!(code = ?error.code, "batch statement failed");
            }
            (None, Some(item)) => match from_item(item) {
                Ok(movie) => movies.push(movie),
                Err(error) => {
                    tracing::warn!(%error, "skipping item that could not be decoded");
                }
            },
            (None, None) => {}
        }
    }
    movies
}

#[cfg(test)]
mod tests {
    use super::*;

    use rstest::rstest;
    use std::collections;

    #[rstest]
    #[case::insert(
        PartiQLRunner::insert_statement,
        r#"INSERT INTO "doc-example-table-movies" VALUE {'title': ?, 'year': ?, 'info': ?}"#
    )]
    #[case::select(
        PartiQLRunner::select_statement,
        r#"SELECT * FROM "doc-example-table-movies" WHERE title=? AND year=?"#
    )]
    #[case::select_all(
        PartiQLRunner::select_all_statement,
        r#"SELECT title, info.rating FROM "doc-example-table-movies""#
    )]
    #[case::update(
        PartiQLRunner::update_statement,
        r#"UPDATE "doc-example-table-movies" SET info.rating=? WHERE title=? AND year=?"#
    )]
    #[case::delete(
        PartiQLRunner::delete_statement,
        r#"DELETE FROM "doc-example-table-movies" WHERE title=? AND year=?"#
    )]
    fn test_statements(
        #[case] statement: fn(&PartiQLRunner) -> String,
        #[case] expected: &str,
    ) {
        let runner = PartiQLRunner {
            table_name: "doc-example-table-movies".to_string(),
        };
        assert_eq!(statement(&runner), expected);
    }

    #[rstest]
    fn test_insert_parameters() {
        let movie = movie::Movie {
            info: movie::Info {
                plot: Some("Nothing happens at all.".to_string()),
                rating: Some(3.5),
            },
            title: "The Big New Movie".to_string(),
            year: 2015,
        };
        let actual = insert_parameters(movie).unwrap();
        let expected = vec![
            types::AttributeValue::S("The Big New Movie".to_string()),
            types::AttributeValue::N("2015".to_string()),
            types::AttributeValue::M(collections::HashMap::from([
                (
                    "plot".to_string(),
                    types::AttributeValue::S("Nothing happens at all.".to_string()),
                ),
                (
                    "rating".to_string(),
                    types::AttributeValue::N("3.5".to_string()),
                ),
            ])),
        ];
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_key_parameters() {
        let key = movie::MovieKey {
            title: "The Big New Movie".to_string(),
            year: 2015,
        };
        let actual = key_parameters(key).unwrap();
        let expected = vec![
            types::AttributeValue::S("The Big New Movie".to_string()),
            types::AttributeValue::N("2015".to_string()),
        ];
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_update_parameters() {
        let update = movie::RatingUpdate {
            key: movie::MovieKey {
                title: "The Big New Movie".to_string(),
                year: 2015,
            },
            rating: 6.5,
        };
        let actual = update_parameters(update).unwrap();
        let expected = vec![
            types::AttributeValue::N("6.5".to_string()),
            types::AttributeValue::S("The Big New Movie".to_string()),
            types::AttributeValue::N("2015".to_string()),
        ];
        assert_eq!(actual, expected);
    }

    #[rstest]
    fn test_statement_request() {
        let request = statement_request(
            "SELECT * FROM \"doc-example-table-movies\" WHERE title=? AND year=?".to_string(),
            vec![
                types::AttributeValue::S("The Big New Movie".to_string()),
                types::AttributeValue::N("2015".to_string()),
            ],
        );
        assert_eq!(
            request.statement(),
            "SELECT * FROM \"doc-example-table-movies\" WHERE title=? AND year=?"
        );
        assert_eq!(
            request.parameters().to_vec(),
            vec![
                types::AttributeValue::S("The Big New Movie".to_string()),
                types::AttributeValue::N("2015".to_string()),
            ]
        );
    }

    #[rstest]
    #[case::skips_missing_items(
        vec![
            types::BatchStatementResponse::builder()
                .item(
                    "title".to_string(),
                    types::AttributeValue::S("The Big New Movie".to_string()),
                )
                .item(
                    "year".to_string(),
                    types::AttributeValue::N("2015".to_string()),
                )
                .build(),
            types::BatchStatementResponse::builder().build(),
            types::BatchStatementResponse::builder()
                .item(
                    "title".to_string(),
                    types::AttributeValue::S("The Bigger Newer Movie".to_string()),
                )
                .item(
                    "year".to_string(),
                    types::AttributeValue::N("2021".to_string()),
                )
                .build(),
        ],
        vec!["The Big New Movie", "The Bigger Newer Movie"]
    )]
    #[case::skips_failed_statements(
        vec![
            types::BatchStatementResponse::builder()
                .error(
                    types::BatchStatementError::builder()
                        .code(types::BatchStatementErrorCodeEnum::ValidationError)
                        .build(),
                )
                .build(),
        ],
        vec![]
    )]
    #[case::skips_undecodable_items(
        vec![
            types::BatchStatementResponse::builder()
                .item(
                    "title".to_string(),
                    types::AttributeValue::S("The Big New Movie".to_string()),
                )
                .item(
                    "year".to_string(),
                    types::AttributeValue::S("not a year".to_string()),
                )
                .build(),
        ],
        vec![]
    )]
    fn test_collect_movies(
        #[case] responses: Vec<types::BatchStatementResponse>,
        #[case] expected_titles: Vec<&str>,
    ) {
        let movies = collect_movies(responses);
        let titles = movies
            .iter()
            .map(|movie| movie.title.as_str())
            .collect::<Vec<_>>();
        assert_eq!(titles, expected_titles);
    }
}
