use std::sync::LazyLock;

use rand::Rng;
use rand::distributions::Alphanumeric;
use regex::Regex;

use crate::request::Request;
use crate::response::{Cookie, Response};

static VALID_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("^[a-zA-Z0-9]{32}$").unwrap_or_else(|e| panic!("invalid session id pattern: {e}"))
});

/// A session id travelling as request parameter or cookie.
///
/// The parameter wins over the cookie. Anything that is not 32 ASCII
/// alphanumerics is ignored and replaced by a fresh random id.
#[derive(Clone, Debug)]
pub struct WebBoundSessionId {
    name: String,
    id: String,
    fresh: bool,
}

impl WebBoundSessionId {
    pub fn new(request: &Request, name: &str) -> Self {
        let sent = request
            .param(name)
            .or_else(|| request.cookie(name).map(str::to_owned))
            .filter(|id| VALID_ID.is_match(id));

        match sent {
            Some(id) => Self { name: name.to_owned(), id, fresh: false },
            None => Self { name: name.to_owned(), id: generate(), fresh: true },
        }
    }

    pub fn name(&self) -> &str { &self.name }
    pub fn id(&self) -> &str { &self.id }

    /// The client did not send a usable id.
    pub fn is_fresh(&self) -> bool { self.fresh }

    /// Switches to a new id and sends it to the client.
    pub fn regenerate(&mut self, response: &mut dyn Response) -> &str {
        self.id = generate();
        self.fresh = true;
        self.bind(response);
        &self.id
    }

    /// Sends the current id to the client.
    pub fn bind(&self, response: &mut dyn Response) {
        response.add_cookie(Cookie::create(&self.name, &self.id).for_path("/"));
    }

    /// Tells the client to drop the id.
    pub fn invalidate(&mut self, response: &mut dyn Response) {
        response.remove_cookie(&self.name);
    }
}

fn generate() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(32)
        .map(char::from)
        .collect()
}
