/// Zoho data centre. Accounts and API hosts differ per data centre and a token
/// issued in one is rejected by the others.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Region {
    #[default]
    Com,
    Eu,
    In,
    ComAu,
    Jp,
    Ca,
    Sa,
    ComCn,
}

impl std::str::FromStr for Region {
    type Err = ();

    fn from_str(s: &str) -> Result<Region, ()> {
        match s.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "com" | "us" => Ok(Region::Com),
            "eu" => Ok(Region::Eu),
            "in" => Ok(Region::In),
            "com.au" | "au" => Ok(Region::ComAu),
            "jp" => Ok(Region::Jp),
            "ca" => Ok(Region::Ca),
            "sa" => Ok(Region::Sa),
            "com.cn" | "cn" => Ok(Region::ComCn),
            _ => Err(()),
        }
    }
}

impl Region {
    pub fn domain(&self) -> &'static str {
        match self {
            Region::Com => "com",
            Region::Eu => "eu",
            Region::In => "in",
            Region::ComAu => "com.au",
            Region::Jp => "jp",
            Region::Ca => "ca",
            Region::Sa => "sa",
            Region::ComCn => "com.cn",
        }
    }

    pub fn urls(&self) -> RegionUrls {
        RegionUrls {
            accounts: format!("https://accounts.zoho.{}", self.domain()),
            api: format!("https://www.zohoapis.{}", self.domain()),
        }
    }
}

/// Base URLs without a trailing slash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionUrls {
    pub accounts: String,
    pub api: String,
}

impl RegionUrls {
    pub fn new(accounts: &str, api: &str) -> RegionUrls {
        RegionUrls {
            accounts: accounts.trim_end_matches('/').to_owned(),
            api: api.trim_end_matches('/').to_owned(),
        }
    }
}

impl Default for RegionUrls {
    fn default() -> RegionUrls {
        Region::default().urls()
    }
}
