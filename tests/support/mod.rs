//! Scripted in-process transport for driving the engine without a server.

#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use livefilter::net::{OptionsRequest, OptionsResponse, OptionsTransport, SearchRequest};
use livefilter::page::{FacetDecl, PageDecl};
use livefilter::sched::lock;

/// One scripted reply: wait `delay`, then answer.
pub struct Reply<T> {
    pub delay: Duration,
    pub body: Result<T, String>,
}

impl<T> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self {
            delay: Duration::ZERO,
            body: Ok(body),
        }
    }

    pub fn after(ms: u64, body: T) -> Self {
        Self {
            delay: Duration::from_millis(ms),
            body: Ok(body),
        }
    }

    pub fn fail(msg: &str) -> Self {
        Self {
            delay: Duration::ZERO,
            body: Err(msg.to_string()),
        }
    }

    pub fn hang() -> Self {
        Self {
            delay: Duration::from_secs(24 * 3600),
            body: Err("never answered".to_string()),
        }
    }
}

/// Unscripted calls answer with an empty body.
#[derive(Default)]
pub struct ScriptedTransport {
    pub options_replies: Mutex<VecDeque<Reply<OptionsResponse>>>,
    pub search_replies: Mutex<VecDeque<Reply<Vec<String>>>>,
    pub options_requests: Mutex<Vec<OptionsRequest>>,
    pub search_requests: Mutex<Vec<SearchRequest>>,
}

impl ScriptedTransport {
    pub fn push_options(&self, reply: Reply<OptionsResponse>) {
        lock(&self.options_replies).push_back(reply);
    }

    pub fn push_search(&self, reply: Reply<Vec<String>>) {
        lock(&self.search_replies).push_back(reply);
    }

    pub fn options_calls(&self) -> usize {
        lock(&self.options_requests).len()
    }

    pub fn search_calls(&self) -> usize {
        lock(&self.search_requests).len()
    }

    pub fn last_options(&self) -> OptionsRequest {
        lock(&self.options_requests).last().cloned().expect("no options request")
    }

    pub fn last_search(&self) -> SearchRequest {
        lock(&self.search_requests).last().cloned().expect("no search request")
    }
}

#[async_trait]
impl OptionsTransport for ScriptedTransport {
    async fn fetch_options(&self, _endpoint: &str, req: &OptionsRequest) -> Result<OptionsResponse> {
        lock(&self.options_requests).push(req.clone());
        let reply = lock(&self.options_replies).pop_front();
        match reply {
            Some(reply) => {
                tokio::time::sleep(reply.delay).await;
                reply.body.map_err(|e| anyhow!(e))
            }
            None => Ok(OptionsResponse::default()),
        }
    }

    async fn search_options(&self, _endpoint: &str, req: &SearchRequest) -> Result<Vec<String>> {
        lock(&self.search_requests).push(req.clone());
        let reply = lock(&self.search_replies).pop_front();
        match reply {
            Some(reply) => {
                tokio::time::sleep(reply.delay).await;
                reply.body.map_err(|e| anyhow!(e))
            }
            None => Ok(Vec::new()),
        }
    }
}

pub fn strings(v: &[&str]) -> Vec<String> {
    v.iter().map(|s| s.to_string()).collect()
}

pub fn options(pairs: &[(&str, &[&str])]) -> OptionsResponse {
    let mut options = BTreeMap::new();
    for (facet, values) in pairs {
        options.insert(facet.to_string(), strings(values));
    }
    OptionsResponse {
        options,
        ..Default::default()
    }
}

/// `loc`, `res_mapped` and the `meterid` search facet.
pub fn page_decl() -> PageDecl {
    PageDecl {
        options_endpoint: "/filters/options".to_string(),
        search_endpoint: None,
        query: String::new(),
        start_date: String::new(),
        end_date: String::new(),
        facets: vec![
            FacetDecl::new("loc"),
            FacetDecl::new("res_mapped"),
            FacetDecl {
                name: "meterid".to_string(),
                selected: None,
                dynamic: true,
            },
        ],
    }
}
