pub mod endpoints {
    pub const AUTH_LOGIN: &str = "/v2/quecauth/accessKeyAuthrize/accessKeyLogin";
    pub const PRODUCTS: &str = "/v2/quecproductmgr/r3/openapi/products";
    pub const PRODUCT_TSL_EXPORT: &str = "/v2/quectsl/openapi/product/export/tslFile";
    pub const DEVICE_OVERVIEW: &str = "/v2/devicemgr/r3/openapi/product/device/overview";
    pub const DEVICE_DETAIL: &str = "/v2/devicemgr/r3/openapi/device/detail";
    pub const DEVICE_LOCATION: &str = "/v2/deviceshadow/r1/openapi/device/getlocation";
    pub const DEVICE_RESOURCE: &str = "/v2/deviceshadow/r2/openapi/device/resource";
    pub const DEVICE_WRITE_DATA: &str = "/v2/deviceshadow/r3/openapi/dm/writeData";
    pub const DATA_HISTORY: &str = "/v2/quecdatastorage/r1/openapi/device/data/history";
    pub const EVENT_HISTORY: &str = "/v2/quecdatastorage/r1/openapi/device/eventdata/history";

    /// Property snapshot endpoints, tried in order until one returns data.
    pub const PROPERTY_CANDIDATES: &[&str] = &[
        "/v2/deviceshadow/r3/openapi/device/property",
        "/v2/deviceshadow/r3/openapi/device/shadow",
        "/v2/devicedata/r3/openapi/property/get",
        "/v2/deviceshadow/r1/openapi/device/property",
    ];
}

pub mod auth {
    pub const SIGN_VERSION: &str = "1";
    pub const AUTH_MODE: &str = "accessKey";
    pub const SIGN_METHOD: &str = "sha256";
    pub const GRANT_TYPE: &str = "password";
    /// Cached credentials with less validity than this are refreshed first.
    pub const REFRESH_MARGIN_SECS: i64 = 3_600;
}

pub mod pagination {
    pub const PAGE_SIZE: usize = 100;
    pub const MAX_PAGES: usize = 100;
}

pub mod history {
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const DEFAULT_LANGUAGE: &str = "CN";
    pub const DIRECTION_UPLINK: i64 = 1;
    pub const LATEST_SCAN_RECORDS: u32 = 30;
    pub const SUMMARY_SCAN_RECORDS: u32 = 20;
}

pub mod upstream {
    pub const SUCCESS_CODE: i64 = 200;
}

pub mod limits {
    pub const ERROR_BODY_PREVIEW_BYTES: usize = 2_048;
}
