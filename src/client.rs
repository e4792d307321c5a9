//! HTTP client for the Outlay record store.
//!
//! Provides both async and blocking client variants behind feature
//! flags. The wire protocol is PostgREST-style: filter predicates are
//! query parameters (`eq.`, `gte.`, `lte.`, `ilike.`), ordering is the
//! `order` parameter, and writes return the affected row when asked to
//! via the `Prefer` header. Authentication is an `apikey` header plus a
//! bearer token.

/// Path of the expense collection endpoint.
const EXPENSES_PATH: &str = "/rest/v1/expenses";

/// Path of the authenticated-user endpoint.
const USER_PATH: &str = "/auth/v1/user";

/// Server-side ordering: date descending, ties broken by creation time
/// descending. The ledger re-sorts local patches with the same
/// comparator.
const ORDER_NEWEST_FIRST: &str = "date.desc,created_at.desc";

/// Name of the API key header.
const APIKEY_HEADER: &str = "apikey";

/// Name of the write-preference header.
const PREFER_HEADER: &str = "Prefer";

/// `Prefer` value asking writes to return the affected row.
const PREFER_REPRESENTATION: &str = "return=representation";

/// `Accept` value selecting a bare object over a one-row array.
const ACCEPT_SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";

#[cfg(any(feature = "async", feature = "blocking"))]
mod wire {
    //! Request-building helpers shared by both client variants.

    use serde::Serialize;

    use crate::models::{ExpenseFilter, NewExpense, UserId};

    /// Insert body: the client-settable fields plus stamped ownership.
    #[derive(Debug, Serialize)]
    pub(super) struct InsertBody<'a> {
        /// Client-settable expense fields.
        #[serde(flatten)]
        pub(super) expense: &'a NewExpense,
        /// Owning user, stamped by the ledger before submission.
        pub(super) user_id: &'a UserId,
    }

    /// Renders filter criteria as PostgREST query parameters.
    ///
    /// Each non-absent field contributes one predicate; both date
    /// bounds share the `date` key.
    pub(super) fn filter_params(filter: &ExpenseFilter) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(category) = filter.category {
            params.push(("category", format!("eq.{category}")));
        }
        if let Some(from) = filter.date_from {
            params.push(("date", format!("gte.{from}")));
        }
        if let Some(to) = filter.date_to {
            params.push(("date", format!("lte.{to}")));
        }
        if let Some(needle) = filter.search.as_ref() {
            params.push(("description", format!("ilike.*{needle}*")));
        }
        params
    }

}

/// Generates an Outlay record store client (async or blocking) with
/// builder, endpoint methods, and tests.
macro_rules! define_client {
    (
        client_name: $client:ident,
        builder_name: $builder:ident,
        http_type: $http_type:ty,
        request_type: $req_type:ty,
        response_type: $resp_type:ty,
        client_doc: $client_doc:expr,
        builder_doc: $builder_doc:expr,
        $(async_kw: $async_kw:tt,)?
        $(await_kw: $await_ext:tt,)?
    ) => {
        #[doc = $builder_doc]
        #[derive(Debug)]
        pub struct $builder {
            /// Record store base URL.
            base_url: Option<String>,
            /// Service API key.
            api_key: Option<SecretString>,
            /// Per-user bearer token, when a session exists.
            access_token: Option<SecretString>,
        }

        impl $builder {
            /// Sets the record store base URL (the project URL; also
            /// how tests point the client at a mock server).
            #[inline]
            #[must_use]
            pub fn base_url<T: Into<String>>(mut self, url: T) -> Self {
                self.base_url = Some(url.into());
                self
            }

            /// Sets the service API key sent with every request.
            #[inline]
            #[must_use]
            pub fn api_key<T: Into<String>>(mut self, key: T) -> Self {
                self.api_key = Some(SecretString::from(key.into()));
                self
            }

            /// Sets the authenticated user's bearer token.
            ///
            /// When unset, the API key doubles as the bearer
            /// credential (anonymous access).
            #[inline]
            #[must_use]
            pub fn access_token<T: Into<String>>(mut self, token: T) -> Self {
                self.access_token = Some(SecretString::from(token.into()));
                self
            }

            /// Builds the client.
            ///
            /// # Errors
            ///
            /// Returns [`OutlayError::MissingBaseUrl`] or
            /// [`OutlayError::MissingApiKey`] if the respective setting
            /// was not provided, and [`OutlayError::Http`] if the HTTP
            /// client fails to build.
            #[inline]
            #[tracing::instrument(skip_all)]
            pub fn build(self) -> Result<$client> {
                let base_url = self.base_url.ok_or(OutlayError::MissingBaseUrl)?;
                let api_key = self.api_key.ok_or(OutlayError::MissingApiKey)?;
                tracing::debug!(base_url = %base_url, "building client");
                let http = <$http_type>::builder().build()?;

                Ok($client {
                    http,
                    base_url,
                    api_key,
                    access_token: self.access_token,
                })
            }
        }

        #[doc = $client_doc]
        #[derive(Debug)]
        pub struct $client {
            /// Underlying HTTP client.
            http: $http_type,
            /// API base URL.
            base_url: String,
            /// Service API key.
            api_key: SecretString,
            /// Per-user bearer token, when a session exists.
            access_token: Option<SecretString>,
        }

        impl $client {
            /// Creates a new builder for configuring the client.
            #[inline]
            #[must_use]
            pub const fn builder() -> $builder {
                $builder {
                    base_url: None,
                    api_key: None,
                    access_token: None,
                }
            }

            /// Bearer credential: the user token when present, the API
            /// key otherwise.
            fn bearer(&self) -> &SecretString {
                self.access_token.as_ref().unwrap_or(&self.api_key)
            }

            /// Attaches the auth headers to a request.
            fn authed(&self, request: $req_type) -> $req_type {
                request
                    .header(APIKEY_HEADER, self.api_key.expose_secret())
                    .header(
                        AUTHORIZATION,
                        format!("Bearer {}", self.bearer().expose_secret()),
                    )
            }

            /// Fetches the user's expenses matching the filter, ordered
            /// by date descending then creation time descending.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server
            /// returns a non-success status, or the response cannot be
            /// deserialized.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn select(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
                tracing::debug!("selecting expenses");
                let url = format!("{}{EXPENSES_PATH}", self.base_url);
                let response = self
                    .authed(self.http.get(&url))
                    .query(&[("select", "*"), ("order", ORDER_NEWEST_FIRST)])
                    .query(&wire::filter_params(filter))
                    .send()
                    $( .$await_ext )?
                    ?;
                self.read_json(response) $( .$await_ext )?
            }

            /// Creates an expense row owned by `user` and returns the
            /// stored record, including the server-assigned id and
            /// timestamps.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the server
            /// rejects the row, or the response cannot be deserialized.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn insert(
                &self,
                expense: &NewExpense,
                user: &UserId,
            ) -> Result<Expense> {
                tracing::debug!(user = %user, "inserting expense");
                let url = format!("{}{EXPENSES_PATH}", self.base_url);
                let body = wire::InsertBody {
                    expense,
                    user_id: user,
                };
                let response = self
                    .authed(self.http.post(&url))
                    .header(PREFER_HEADER, PREFER_REPRESENTATION)
                    .header(ACCEPT, ACCEPT_SINGLE_OBJECT)
                    .header(CONTENT_TYPE, "application/json")
                    .json(&body)
                    .send()
                    $( .$await_ext )?
                    ?;
                self.read_json(response) $( .$await_ext )?
            }

            /// Applies a partial field set to the row with the given id
            /// and returns the updated record.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails or the server
            /// rejects the patch; a missing or foreign row surfaces as
            /// the server's own error status.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn update(
                &self,
                id: &ExpenseId,
                patch: &ExpensePatch,
            ) -> Result<Expense> {
                tracing::debug!("updating expense");
                let url = format!("{}{EXPENSES_PATH}", self.base_url);
                let response = self
                    .authed(self.http.patch(&url))
                    .query(&[("id", format!("eq.{id}"))])
                    .header(PREFER_HEADER, PREFER_REPRESENTATION)
                    .header(ACCEPT, ACCEPT_SINGLE_OBJECT)
                    .header(CONTENT_TYPE, "application/json")
                    .json(patch)
                    .send()
                    $( .$await_ext )?
                    ?;
                self.read_json(response) $( .$await_ext )?
            }

            /// Deletes the row with the given id.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails or the server
            /// returns a non-success status.
            #[tracing::instrument(skip_all, fields(id = %id))]
            pub $($async_kw)? fn delete(&self, id: &ExpenseId) -> Result<()> {
                tracing::debug!("deleting expense");
                let url = format!("{}{EXPENSES_PATH}", self.base_url);
                let response = self
                    .authed(self.http.delete(&url))
                    .query(&[("id", format!("eq.{id}"))])
                    .send()
                    $( .$await_ext )?
                    ?;
                if response.status().is_success() {
                    Ok(())
                } else {
                    Err(self.api_error(response) $( .$await_ext )?)
                }
            }

            /// Resolves the user behind the bearer token.
            ///
            /// # Errors
            ///
            /// Returns an error if the HTTP request fails, the token is
            /// not accepted, or the response cannot be deserialized.
            #[tracing::instrument(skip_all)]
            pub $($async_kw)? fn current_user(&self) -> Result<AuthUser> {
                tracing::debug!("resolving current user");
                let url = format!("{}{USER_PATH}", self.base_url);
                let response = self
                    .authed(self.http.get(&url))
                    .send()
                    $( .$await_ext )?
                    ?;
                self.read_json(response) $( .$await_ext )?
            }

            /// Checks the response status and deserializes a JSON body.
            #[tracing::instrument(skip_all)]
            $($async_kw)? fn read_json<Resp: serde::de::DeserializeOwned>(
                &self,
                response: $resp_type,
            ) -> Result<Resp> {
                let status = response.status();
                tracing::debug!(status = %status, "received response");
                if status.is_success() {
                    let body = response.text() $( .$await_ext )? ?;
                    tracing::trace!(body_len = body.len(), "parsing response body");
                    serde_json::from_str(&body).map_err(OutlayError::from)
                } else {
                    Err(self.api_error(response) $( .$await_ext )?)
                }
            }

            /// Converts a non-success response into an API error.
            $($async_kw)? fn api_error(&self, response: $resp_type) -> OutlayError {
                let status = response.status();
                let message = response
                    .text()
                    $( .$await_ext )?
                    .unwrap_or_else(|_| "unknown error".to_owned());
                tracing::debug!(status = status.as_u16(), message = %message, "record store error");
                OutlayError::Api {
                    status: status.as_u16(),
                    message,
                }
            }
        }

    };
}

#[cfg(feature = "async")]
mod async_client {
    //! Async HTTP client for the Outlay record store.

    use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use secrecy::{ExposeSecret, SecretString};

    use super::{
        ACCEPT_SINGLE_OBJECT, APIKEY_HEADER, EXPENSES_PATH, ORDER_NEWEST_FIRST, PREFER_HEADER,
        PREFER_REPRESENTATION, USER_PATH, wire,
    };
    use crate::error::{OutlayError, Result};
    use crate::models::{AuthUser, Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

    define_client! {
        client_name: RecordStoreClient,
        builder_name: RecordStoreClientBuilder,
        http_type: reqwest::Client,
        request_type: reqwest::RequestBuilder,
        response_type: reqwest::Response,
        client_doc: "Async client for the Outlay record store.\n\nUse [`RecordStoreClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`RecordStoreClient`].",
        async_kw: async,
        await_kw: await,
    }

    impl crate::store::RecordStore for RecordStoreClient {
        async fn current_user(&self) -> Result<UserId> {
            self.current_user().await.map(|user| user.id)
        }

        async fn select(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
            self.select(filter).await
        }

        async fn insert(&self, expense: NewExpense, user: UserId) -> Result<Expense> {
            self.insert(&expense, &user).await
        }

        async fn update(&self, id: &ExpenseId, patch: ExpensePatch) -> Result<Expense> {
            self.update(id, &patch).await
        }

        async fn delete(&self, id: &ExpenseId) -> Result<()> {
            self.delete(id).await
        }
    }
}

#[cfg(feature = "blocking")]
mod blocking_client {
    //! Blocking (synchronous) HTTP client for the Outlay record store.

    use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
    use secrecy::{ExposeSecret, SecretString};

    use super::{
        ACCEPT_SINGLE_OBJECT, APIKEY_HEADER, EXPENSES_PATH, ORDER_NEWEST_FIRST, PREFER_HEADER,
        PREFER_REPRESENTATION, USER_PATH, wire,
    };
    use crate::error::{OutlayError, Result};
    use crate::models::{AuthUser, Expense, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

    define_client! {
        client_name: RecordStoreBlockingClient,
        builder_name: RecordStoreBlockingClientBuilder,
        http_type: reqwest::blocking::Client,
        request_type: reqwest::blocking::RequestBuilder,
        response_type: reqwest::blocking::Response,
        client_doc: "Blocking (synchronous) client for the Outlay record store.\n\nUse [`RecordStoreBlockingClient::builder()`] to construct an instance.",
        builder_doc: "Builder for constructing a [`RecordStoreBlockingClient`].",
    }

    impl crate::store::BlockingRecordStore for RecordStoreBlockingClient {
        fn current_user(&self) -> Result<UserId> {
            self.current_user().map(|user| user.id)
        }

        fn select(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>> {
            self.select(filter)
        }

        fn insert(&self, expense: NewExpense, user: UserId) -> Result<Expense> {
            self.insert(&expense, &user)
        }

        fn update(&self, id: &ExpenseId, patch: ExpensePatch) -> Result<Expense> {
            self.update(id, &patch)
        }

        fn delete(&self, id: &ExpenseId) -> Result<()> {
            self.delete(id)
        }
    }
}

#[cfg(feature = "async")]
pub use async_client::{RecordStoreClient, RecordStoreClientBuilder};
#[cfg(feature = "blocking")]
pub use blocking_client::{RecordStoreBlockingClient, RecordStoreBlockingClientBuilder};

#[cfg(all(test, feature = "async"))]
mod http_tests {
    use chrono::NaiveDate;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;
    use crate::error::OutlayError;
    use crate::models::{Category, ExpenseFilter, ExpenseId, ExpensePatch, NewExpense, UserId};

    /// JSON body of a stored expense row.
    fn expense_json(id: &str, amount: f64, category: &str) -> serde_json::Value {
        json!({
            "id": id,
            "amount": amount,
            "category": category,
            "description": "mock row",
            "date": "2024-03-18",
            "created_at": "2024-03-18T12:04:33Z",
            "updated_at": "2024-03-18T12:04:33Z",
            "user_id": "user-1"
        })
    }

    /// Client pointed at the mock server with both credentials set.
    fn client_for(server: &MockServer) -> RecordStoreClient {
        RecordStoreClient::builder()
            .base_url(server.uri())
            .api_key("anon-key")
            .access_token("user-jwt")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn select_sends_auth_ordering_and_predicates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EXPENSES_PATH))
            .and(query_param("select", "*"))
            .and(query_param("order", "date.desc,created_at.desc"))
            .and(query_param("category", "eq.Food"))
            .and(query_param("description", "ilike.*coffee*"))
            .and(header("apikey", "anon-key"))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([expense_json("exp-1", 4.5, "Food")])),
            )
            .mount(&server)
            .await;

        let client = client_for(&server);
        let filter = ExpenseFilter::new()
            .category(Category::Food)
            .search("coffee");
        let rows = client.select(&filter).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(
            rows.first().map(|row| row.id.clone()),
            Some(ExpenseId::from("exp-1"))
        );
    }

    #[tokio::test]
    async fn select_encodes_both_date_bounds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EXPENSES_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let filter = ExpenseFilter::new().date_range(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        );
        let rows = client.select(&filter).await.unwrap();
        assert!(rows.is_empty());

        let requests = server.received_requests().await.unwrap();
        let query = requests
            .first()
            .and_then(|request| request.url.query())
            .unwrap_or_default()
            .to_owned();
        assert!(query.contains("date=gte.2024-01-01"));
        assert!(query.contains("date=lte.2024-01-31"));
    }

    #[tokio::test]
    async fn insert_stamps_ownership_and_returns_row() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(EXPENSES_PATH))
            .and(header("prefer", "return=representation"))
            .and(body_partial_json(json!({
                "amount": 4.5,
                "category": "Food",
                "user_id": "user-1"
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(expense_json("exp-9", 4.5, "Food")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let payload = NewExpense::new(
            4.5,
            Category::Food,
            "mock row",
            NaiveDate::from_ymd_opt(2024, 3, 18).unwrap(),
        )
        .unwrap();
        let created = client.insert(&payload, &UserId::from("user-1")).await.unwrap();
        assert_eq!(created.id, ExpenseId::from("exp-9"));
    }

    #[tokio::test]
    async fn update_targets_row_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path(EXPENSES_PATH))
            .and(query_param("id", "eq.exp-9"))
            .and(body_partial_json(json!({"amount": 6.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(expense_json("exp-9", 6.0, "Food")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let updated = client
            .update(&ExpenseId::from("exp-9"), &ExpensePatch::new().amount(6.0))
            .await
            .unwrap();
        assert!((updated.amount - 6.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn delete_targets_row_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(EXPENSES_PATH))
            .and(query_param("id", "eq.exp-9"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let client = client_for(&server);
        client.delete(&ExpenseId::from("exp-9")).await.unwrap();
    }

    #[tokio::test]
    async fn current_user_resolves_identity() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(USER_PATH))
            .and(header("authorization", "Bearer user-jwt"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "user-7",
                "email": "sam@example.com"
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let user = client.current_user().await.unwrap();
        assert_eq!(user.id, UserId::from("user-7"));
    }

    #[tokio::test]
    async fn rejected_write_surfaces_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(EXPENSES_PATH))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client.select(&ExpenseFilter::new()).await;
        match result {
            Err(OutlayError::Api { status, message }) => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            Ok(_) | Err(_) => panic!("expected an api error"),
        }
    }
}
