//! HTML bodies for the two emails the watcher sends.

pub const MATCH_SUBJECT: &str = "Parabéns! Seu nome foi encontrado no Diário Oficial";
pub const FAILURE_SUBJECT: &str = "Falha na Verificação do Diário Oficial";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    /// Sent to a person whose name appeared in today's gazette.
    MatchNotice,
    /// Sent to everyone when the gazette could not be checked.
    FailureNotice,
}

impl Template {
    pub fn as_str(&self) -> &'static str {
        match self {
            Template::MatchNotice => "match_notice",
            Template::FailureNotice => "failure_notice",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateParams {
    pub recipient_name: String,
    pub logo_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

pub trait TemplateRenderer: Send + Sync {
    fn render(&self, template: Template, params: &TemplateParams) -> RenderedEmail;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlTemplates;

impl HtmlTemplates {
    fn layout(title: &str, greeting: &str, body: &str, logo_url: Option<&str>) -> String {
        let logo = logo_url
            .map(|url| {
                format!(
                    r#"<img src="{}" alt="Meu Diário Oficial" style="max-width:200px;margin-bottom:16px;">"#,
                    html_escape(url)
                )
            })
            .unwrap_or_default();

        format!(
            r#"<!DOCTYPE html>
<html lang="pt-BR">
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="font-family:Arial,sans-serif;color:#333;">
<div style="max-width:600px;margin:0 auto;padding:20px;text-align:center;">
{logo}
<h2>{greeting}</h2>
<p>{body}</p>
</div>
</body>
</html>"#
        )
    }
}

impl TemplateRenderer for HtmlTemplates {
    fn render(&self, template: Template, params: &TemplateParams) -> RenderedEmail {
        let name = html_escape(&params.recipient_name);
        let logo = params.logo_url.as_deref();
        match template {
            Template::MatchNotice => RenderedEmail {
                subject: MATCH_SUBJECT.to_string(),
                html: Self::layout(
                    MATCH_SUBJECT,
                    &format!("Parabéns, {}!", name),
                    "Seu nome foi encontrado no Diário Oficial de Salvador! \
                     Por favor, verifique diretamente no site para qual concurso você foi convocado. \
                     Estamos torcendo por você!",
                    logo,
                ),
            },
            Template::FailureNotice => RenderedEmail {
                subject: FAILURE_SUBJECT.to_string(),
                html: Self::layout(
                    FAILURE_SUBJECT,
                    &format!("Olá, {}.", name),
                    "Houve uma falha ao tentar verificar o Diário Oficial de Salvador. \
                     Por favor, verifique manualmente no site para mais detalhes.",
                    logo,
                ),
            },
        }
    }
}

pub fn html_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
