//! 📚 xAPI vocabulary: verbs, activity types, extension IRIs and display names.

pub const EN: &str = "en";
pub const VERSION: &str = "1.0.3";

// -- activities
pub const XAPI_ACTIVITY_BOOK: &str = "http://id.tincanapi.com/activitytype/book";
pub const XAPI_ACTIVITY_PAGE: &str = "http://activitystrea.ms/schema/1.0/page";
pub const XAPI_ACTIVITY_MODULE: &str = "http://adlnet.gov/expapi/activities/module";

// -- verbs
pub const XAPI_VERB_INITIALIZED: &str = "http://adlnet.gov/expapi/verbs/initialized";
pub const XAPI_VERB_INTERACTED: &str = "http://adlnet.gov/expapi/verbs/interacted";
pub const XAPI_VERB_TERMINATED: &str = "http://adlnet.gov/expapi/verbs/terminated";
pub const XAPI_VERB_VIEWED: &str = "http://id.tincanapi.com/verb/viewed";

// -- extensions
pub const XAPI_EXTENSION_ACCEPT_LANGUAGE: &str = "https://www.edx.org/extension/accept_language";
pub const XAPI_EXTENSION_AGENT: &str = "https://www.edx.org/extension/agent";
pub const XAPI_EXTENSION_COLLECTION_TYPE: &str = "http://id.tincanapi.com/extension/collection-type";
pub const XAPI_EXTENSION_COURSE_ID: &str = "https://www.edx.org/extension/course_id";
pub const XAPI_EXTENSION_COURSE_USER_TAGS: &str = "https://www.edx.org/extension/course_user_tags";
pub const XAPI_EXTENSION_DIRECTION: &str = "https://www.edx.org/extension/textbook/direction";
pub const XAPI_EXTENSION_ENDING_POSITION: &str = "http://id.tincanapi.com/extension/ending-position";
pub const XAPI_EXTENSION_HOST: &str = "https://www.edx.org/extension/host";
pub const XAPI_EXTENSION_IP: &str = "https://www.edx.org/extension/ip";
pub const XAPI_EXTENSION_ORG_ID: &str = "https://www.edx.org/extension/org_id";
pub const XAPI_EXTENSION_PATH: &str = "https://www.edx.org/extension/path";
pub const XAPI_EXTENSION_POSITION: &str = "http://id.tincanapi.com/extension/position";
pub const XAPI_EXTENSION_REFERER: &str = "https://www.edx.org/extension/referer";
pub const XAPI_EXTENSION_REQUEST: &str = "https://www.edx.org/extension/request";
pub const XAPI_EXTENSION_SESSION: &str = "https://www.edx.org/extension/session";
pub const XAPI_EXTENSION_STARTING_POSITION: &str =
    "http://id.tincanapi.com/extension/starting-position";
pub const XAPI_EXTENSION_THUMBNAIL_TITLE: &str =
    "https://www.edx.org/extension/textbook/thumbnail_title";
pub const XAPI_EXTENSION_ZOOM_AMOUNT: &str = "https://www.edx.org/extension/textbook/zoom/amount";

// -- display names
pub const BOOK: &str = "book";
pub const INITIALIZED: &str = "initialized";
pub const INTERACTED: &str = "interacted";
pub const MODULE: &str = "module";
pub const PAGE: &str = "page";
pub const TERMINATED: &str = "terminated";
pub const VIEWED: &str = "viewed";
