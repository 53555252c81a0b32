use serde::Serialize;
use snapd_protocol::types::{Change, ThemeStatus};
use snapd_protocol::{HttpRequest, Result};

use crate::request::{Reply, Request, Response, async_change, sync_result};

/// `GET /v2/accessories/themes`: which of the named themes are installable.
#[derive(Debug, Clone, Default)]
pub struct CheckThemes {
    pub gtk_themes: Vec<String>,
    pub icon_themes: Vec<String>,
    pub sound_themes: Vec<String>,
}

impl Request for CheckThemes {
    type Output = ThemeStatus;
    const NAME: &'static str = "check-themes";

    fn generate(&self) -> Result<HttpRequest> {
        let mut request = HttpRequest::get("/v2/accessories/themes");
        // one parameter per theme, repeated
        for (key, themes) in [
            ("gtk-theme", &self.gtk_themes),
            ("icon-theme", &self.icon_themes),
            ("sound-theme", &self.sound_themes),
        ] {
            for theme in themes {
                request = request.query(key, theme.clone());
            }
        }
        Ok(request)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        sync_result(response)
    }
}

/// `POST /v2/accessories/themes`: install the snaps providing these themes.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct InstallThemes {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub gtk_themes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub icon_themes: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sound_themes: Vec<String>,
}

impl Request for InstallThemes {
    type Output = ();
    const NAME: &'static str = "install-themes";

    fn generate(&self) -> Result<HttpRequest> {
        HttpRequest::post("/v2/accessories/themes").json(self)
    }

    fn parse_response(&self, response: Response) -> Result<Reply<Self::Output>> {
        async_change(response)
    }

    fn complete(&self, _change: &Change) -> Result<Self::Output> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repeated_theme_parameters() {
        let request = CheckThemes {
            gtk_themes: vec!["Yaru".into(), "Adwaita dark".into()],
            icon_themes: vec!["Papirus".into()],
            sound_themes: Vec::new(),
        };
        assert_eq!(
            request.generate().unwrap().target(),
            "/v2/accessories/themes?gtk-theme=Yaru&gtk-theme=Adwaita%20dark&icon-theme=Papirus"
        );
    }
}
