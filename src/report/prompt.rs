use crate::models::NewsItem;
use crate::scoring::ScoreResult;

const NO_NEWS_LINE: &str = "(nenhuma notícia retornada pela API)";

/// 分析結果を埋め込んだ PT-BR のプロンプトを組み立てる。
///
/// 入力が同じなら出力も同じ文字列になる。
#[must_use]
pub fn build_prompt(city: &str, query: &str, news: &[NewsItem], score: &ScoreResult) -> String {
    let breakdown = serde_json::to_string(&score.breakdown).unwrap_or_default();
    let signals = &score.meta.signals;

    let lines: Vec<String> = news
        .iter()
        .map(|item| {
            format!(
                "- {} ({}) — fonte: {} — url: {}",
                item.title,
                item.published_at.as_deref().unwrap_or_default(),
                item.source.as_deref().unwrap_or_default(),
                item.url,
            )
        })
        .collect();
    let news_text = if lines.is_empty() {
        NO_NEWS_LINE.to_string()
    } else {
        lines.join("\n")
    };

    format!(
        r#"Você é um consultor neutro de decisão imobiliária. Gere um relatório objetivo em PT-BR.
NÃO invente dados. Se não houver dados suficientes, seja transparente e conservador.

Cidade piloto: {city}
Consulta do usuário: {query}

Pontuação calculada (heurística determinística):
- Nota do local: {place} / 100
- Confiança: {confidence} / 100
- Total: {total} / 100 ({label})
- Quebra por bloco: {breakdown}
- Sinais nas notícias: {positive} positivos, {monitor} a monitorar, {negative} negativos

Notícias/eventos do entorno (últimos meses):
{news_text}

Tarefa:
1) Produza um resumo em 1 frase (summary) que explique a conclusão com equilíbrio.
2) Liste 3–5 pontos fortes (positives), 2–4 pontos de atenção (cautions) e 0–3 riscos (risks).
3) Produza até 5 itens de radar (radar). Cada item deve ser baseado nas notícias fornecidas; se não houver notícias, retorne radar vazio [].
   - impact: "positive" | "monitor" | "risk"
   - title: título curto
   - date: data (se disponível)
   - why_it_matters: 1–2 frases objetivas
   - source: nome da fonte (se disponível)

Responda SOMENTE no formato JSON válido, com estas chaves exatas:
{{
  "summary": string,
  "positives": string[],
  "cautions": string[],
  "risks": string[],
  "radar": [{{"impact":"positive|monitor|risk","title":string,"date":string?,"why_it_matters":string,"source":string?}}]
}}"#,
        place = score.place_score,
        confidence = score.confidence,
        total = score.total,
        label = score.label,
        positive = signals.positive,
        monitor = signals.monitor,
        negative = signals.negative,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scoring::{FusionParams, ScoringEngine, SignalClassifier};

    fn score_for(query: &str, news: &[NewsItem]) -> ScoreResult {
        ScoringEngine::new(
            SignalClassifier::portuguese().expect("rules"),
            FusionParams::default(),
        )
        .score(query, news)
    }

    #[test]
    fn prompt_embeds_score_and_placeholder_without_news() {
        let score = score_for("Rua Augusta, 123", &[]);
        let prompt = build_prompt("São Paulo", "Rua Augusta, 123", &[], &score);

        assert!(prompt.contains("Cidade piloto: São Paulo"));
        assert!(prompt.contains("Consulta do usuário: Rua Augusta, 123"));
        assert!(prompt.contains("- Nota do local: 65 / 100"));
        assert!(prompt.contains("- Confiança: 56 / 100"));
        assert!(prompt.contains("- Total: 54 / 100 (Neutro (precisa de mais dados))"));
        assert!(prompt.contains("\"Radar do Entorno\":10"));
        assert!(prompt.contains(NO_NEWS_LINE));
        assert!(prompt.ends_with('}'));
    }

    #[test]
    fn prompt_lists_news_lines() {
        let news = vec![
            NewsItem {
                title: "Assalto na região".into(),
                url: "https://g1.globo.com/a".into(),
                published_at: Some("2025-02-10".into()),
                source: Some("G1".into()),
            },
            NewsItem {
                title: "Obra no metrô".into(),
                url: String::new(),
                published_at: None,
                source: None,
            },
        ];
        let score = score_for("Pinheiros", &news);
        let prompt = build_prompt("São Paulo", "Pinheiros", &news, &score);

        assert!(prompt.contains(
            "- Assalto na região (2025-02-10) — fonte: G1 — url: https://g1.globo.com/a\n- Obra no metrô () — fonte:  — url: \n"
        ));
        assert!(prompt.contains("1 positivos, 0 a monitorar, 1 negativos"));
        assert!(!prompt.contains(NO_NEWS_LINE));
    }

    #[test]
    fn prompt_is_deterministic() {
        let score = score_for("Moema", &[]);
        assert_eq!(
            build_prompt("São Paulo", "Moema", &[], &score),
            build_prompt("São Paulo", "Moema", &[], &score)
        );
    }
}
