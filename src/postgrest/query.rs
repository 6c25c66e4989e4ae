//! Query builders for PostgrestClient

use reqwest::Client;
use serde::{de::DeserializeOwned, Serialize};

use crate::error::Result;
use crate::fetch::{Fetch, FetchBuilder};
use crate::postgrest::filter::*;
use crate::postgrest::types::ReturnOption;

/// Where a query goes and who it runs as
#[derive(Debug, Clone)]
pub struct Target {
    /// Table URL
    pub(crate) url: String,

    /// The API key
    pub(crate) key: String,

    /// Bearer token (access token, or the API key for anonymous calls)
    pub(crate) token: String,

    /// HTTP client
    pub(crate) client: Client,
}

impl Target {
    fn prepare<'a>(&'a self, fetch: FetchBuilder<'a>) -> FetchBuilder<'a> {
        fetch.api_key(&self.key, &self.token)
    }
}

/// Filters shared by the builders that target existing rows
#[derive(Debug, Clone, Default)]
pub struct QueryBuilder {
    /// Query parameters, in insertion order
    params: Vec<(String, String)>,
}

impl QueryBuilder {
    /// Create a new QueryBuilder
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter to the query
    pub fn add_param(&mut self, key: &str, value: &str) {
        self.params.push((key.to_string(), value.to_string()));
    }

    /// Add a filter to the query
    pub fn add_filter(&mut self, filter: Filter) {
        self.params.push(filter.to_param());
    }

    /// Get the query parameters
    pub fn get_params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// Builder for SELECT queries
pub struct SelectBuilder {
    target: Target,
    query: QueryBuilder,
}

impl SelectBuilder {
    /// Create a new SelectBuilder
    pub fn new(target: Target, columns: &str) -> Self {
        let mut query = QueryBuilder::new();
        query.add_param("select", columns);
        Self { target, query }
    }

    /// Filter rows with an arbitrary filter
    pub fn filter(&mut self, filter: Filter) -> &mut Self {
        self.query.add_filter(filter);
        self
    }

    /// Filter rows where column equals a value
    pub fn eq<T: ToString>(&mut self, column: &str, value: T) -> &mut Self {
        self.filter(Filter::new(column, FilterOperator::Eq, value))
    }

    /// Filter rows where column is in a list of values
    pub fn in_list<T: ToString>(&mut self, column: &str, values: &[T]) -> &mut Self {
        self.filter(Filter::in_list(column, values))
    }

    /// Filter rows where column is not null
    pub fn not_null(&mut self, column: &str) -> &mut Self {
        self.filter(Filter::new(column, FilterOperator::Is, "null").not())
    }

    /// Order the results by a column
    pub fn order(&mut self, column: &str, ascending: bool) -> &mut Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.query.add_param("order", &format!("{}.{}", column, direction));
        self
    }

    /// Limit the number of rows returned
    pub fn limit(&mut self, count: usize) -> &mut Self {
        self.query.add_param("limit", &count.to_string());
        self
    }

    /// Execute the query and return the results
    pub async fn execute<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let fetch = Fetch::get(&self.target.client, &self.target.url)
            .query(self.query.get_params().iter().cloned());

        self.target.prepare(fetch).execute::<Vec<T>>().await
    }
}

/// Builder for INSERT queries
pub struct InsertBuilder<T: Serialize> {
    target: Target,
    values: T,
}

impl<T: Serialize> InsertBuilder<T> {
    /// Create a new InsertBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self { target, values }
    }

    /// Execute the query and return the inserted rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let fetch = Fetch::post(&self.target.client, &self.target.url)
            .header("Prefer", ReturnOption::Representation.as_str())
            .json(&self.values)?;

        self.target.prepare(fetch).execute::<Vec<R>>().await
    }

    /// Execute the query without returning the inserted data
    pub async fn execute_no_return(&self) -> Result<()> {
        let fetch = Fetch::post(&self.target.client, &self.target.url)
            .header("Prefer", ReturnOption::Minimal.as_str())
            .json(&self.values)?;

        self.target.prepare(fetch).execute_checked().await?;
        Ok(())
    }
}

/// Builder for UPDATE queries
pub struct UpdateBuilder<T: Serialize> {
    target: Target,
    values: T,
    query: QueryBuilder,
}

impl<T: Serialize> UpdateBuilder<T> {
    /// Create a new UpdateBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query
            .add_filter(Filter::new(column, FilterOperator::Eq, value));
        self
    }

    /// Execute the query and return the updated rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        let fetch = Fetch::patch(&self.target.client, &self.target.url)
            .header("Prefer", ReturnOption::Representation.as_str())
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)?;

        self.target.prepare(fetch).execute::<Vec<R>>().await
    }

    /// Execute the query without returning the updated data
    pub async fn execute_no_return(&self) -> Result<()> {
        let fetch = Fetch::patch(&self.target.client, &self.target.url)
            .header("Prefer", ReturnOption::Minimal.as_str())
            .query(self.query.get_params().iter().cloned())
            .json(&self.values)?;

        self.target.prepare(fetch).execute_checked().await?;
        Ok(())
    }
}

/// Builder for UPSERT queries
pub struct UpsertBuilder<T: Serialize> {
    target: Target,
    values: T,
    on_conflict: Option<String>,
}

impl<T: Serialize> UpsertBuilder<T> {
    /// Create a new UpsertBuilder
    pub fn new(target: Target, values: T) -> Self {
        Self {
            target,
            values,
            on_conflict: None,
        }
    }

    /// Specify the column(s) to check for conflicts
    pub fn on_conflict(&mut self, columns: &str) -> &mut Self {
        self.on_conflict = Some(columns.to_string());
        self
    }

    fn build(&self, ret: ReturnOption) -> Result<FetchBuilder<'_>> {
        let mut fetch = Fetch::post(&self.target.client, &self.target.url).header(
            "Prefer",
            &format!("resolution=merge-duplicates,{}", ret.as_str()),
        );

        if let Some(ref conflict) = self.on_conflict {
            fetch = fetch.query([("on_conflict", conflict.as_str())]);
        }

        Ok(self.target.prepare(fetch.json(&self.values)?))
    }

    /// Execute the query and return the resulting rows
    pub async fn execute<R: DeserializeOwned>(&self) -> Result<Vec<R>> {
        self.build(ReturnOption::Representation)?
            .execute::<Vec<R>>()
            .await
    }

    /// Execute the query without returning the upserted data
    pub async fn execute_no_return(&self) -> Result<()> {
        self.build(ReturnOption::Minimal)?.execute_checked().await?;
        Ok(())
    }
}

/// Builder for DELETE queries
pub struct DeleteBuilder {
    target: Target,
    query: QueryBuilder,
}

impl DeleteBuilder {
    /// Create a new DeleteBuilder
    pub fn new(target: Target) -> Self {
        Self {
            target,
            query: QueryBuilder::new(),
        }
    }

    /// Filter rows where column equals a value
    pub fn eq<V: ToString>(&mut self, column: &str, value: V) -> &mut Self {
        self.query
            .add_filter(Filter::new(column, FilterOperator::Eq, value));
        self
    }

    /// Execute the query without returning the deleted data
    pub async fn execute_no_return(&self) -> Result<()> {
        let fetch = Fetch::delete(&self.target.client, &self.target.url)
            .header("Prefer", ReturnOption::Minimal.as_str())
            .query(self.query.get_params().iter().cloned());

        self.target.prepare(fetch).execute_checked().await?;
        Ok(())
    }
}
