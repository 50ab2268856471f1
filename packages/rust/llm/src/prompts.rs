//! Prompt builders for the language-model collaborators.
//!
//! The wording here is part of the collaborator contract: generation prompts
//! demand strict JSON output so the parsing helpers can stay simple, and the
//! extraction prompt pins the exact record shape the core validates.

use brandlens_shared::QueryCategory;

/// Classify the commercial industry a brand operates in.
pub fn industry_prompt(site_text: &str) -> String {
    format!(
        "You are an industry classifier.\n\
         \n\
         Identify the commercial industry or product/service category the brand\n\
         operates in, based ONLY on the website text below.\n\
         \n\
         RULES:\n\
         - Return ONLY a short industry/category phrase.\n\
         - MUST represent what the company SELLS (products/services), not research.\n\
         - MUST be consumer/business facing (e.g. \"headphones\", \"skincare\", \"pharmaceuticals\").\n\
         - DO NOT return scientific fields unless the company directly sells them.\n\
         - Ignore research partners, citations, case studies, and academic language.\n\
         - If the text is unclear, infer the most likely COMMERCIAL category.\n\
         \n\
         Website text:\n{site_text}"
    )
}

/// Discover direct competitors from website evidence.
pub fn competitor_prompt(brand: &str, industry: &str, site_text: &str) -> String {
    format!(
        "You are a COMPETITOR DISCOVERY ENGINE.\n\
         \n\
         Brand to analyze: {brand}\n\
         Industry: {industry}\n\
         \n\
         Identify companies that are DIRECT COMPETITORS of the brand — companies\n\
         selling similar products/services to similar customers. Use the website\n\
         text below as your evidence base; if it does not explicitly list\n\
         competitors, infer them logically from the industry and product domain.\n\
         \n\
         EXCLUDE: the brand itself (\"{brand}\"), retailers and marketplaces\n\
         (Amazon, Walmart, Best Buy), infrastructure/cloud providers unless they\n\
         directly compete in the brand's product space, investors, clients, job\n\
         boards, and companies mentioned only incidentally.\n\
         \n\
         OUTPUT: ONLY a JSON array of company names. No duplicates. No\n\
         explanations. Aim for 3-15 high-quality competitors.\n\
         \n\
         WEBSITE TEXT:\n{site_text}"
    )
}

/// Generate buyer-intent search queries for one category.
pub fn query_generation_prompt(
    category: QueryCategory,
    brand: &str,
    industry: &str,
    competitors: &[String],
    region: &str,
    count: usize,
) -> String {
    let competitor_list = if competitors.is_empty() {
        "other brands".to_string()
    } else {
        competitors.join(", ")
    };

    let base = format!(
        "You are a BUYER-INTENT SEARCH QUERY GENERATOR.\n\
         \n\
         Generate REALISTIC consumer Google-style search queries for users\n\
         researching or buying products/services in this industry.\n\
         \n\
         Industry: \"{industry}\"\n\
         Brand: \"{brand}\"\n\
         Competitors: {competitor_list}\n\
         Region: {region}\n\
         \n\
         REGIONAL RULES:\n\
         - Phrasing MUST reflect real user behavior in the region.\n\
         - Use region-appropriate currency and realistic price thresholds\n\
           (India: rupees; US: $; UK: GBP; EU: EUR; global: no currency or $).\n\
         - Use region-specific phrasing (\"near me\", \"best budget\", \"value for money\").\n\
         \n\
         GLOBAL RULES:\n\
         - MUST sound like natural consumer search queries, 3-12 words.\n\
         - MUST reflect real buyer intent: best, top, price, deals, under X,\n\
           reviews, near me, compare, alternatives.\n\
         - MUST be product- or service-level queries only.\n\
         - NEVER invent product names not implied by the industry text.\n\
         - NEVER use corporate/B2B language (\"providers\", \"solutions\",\n\
           \"platform\", \"enterprise\").\n\
         - NEVER generate informational queries (\"what is\", \"how does\").\n\
         - ALWAYS vary structure: questions, fragments, comparisons, pricing.\n"
    );

    let category_rules = match category {
        QueryCategory::BestOf => format!(
            "CATEGORY: best_of\n\
             - DO NOT mention \"{brand}\" or any competitor.\n\
             - Generic product/service-level queries within the industry only.\n\
             - MUST express purchase intent (best, top, under X, for Y).\n\
             - MUST NOT refer to the entire industry as a whole."
        ),
        QueryCategory::Budget => format!(
            "CATEGORY: budget\n\
             - DO NOT mention \"{brand}\" or any competitor.\n\
             - Price/value-focused queries with strong purchase intent\n\
               (cheap, affordable, budget-friendly, best under <price>)."
        ),
        QueryCategory::Comparison => format!(
            "CATEGORY: comparison\n\
             - MUST include the brand \"{brand}\" in every query.\n\
             - MUST include at least one competitor from: {competitor_list}.\n\
             - Product-level comparisons with buying intent\n\
               (\"{brand} vs <competitor> <product>\", \"is {brand} better than <competitor>\").\n\
             - NEVER compare competitors without \"{brand}\"."
        ),
        QueryCategory::Branded => format!(
            "CATEGORY: branded\n\
             - MUST include the brand name \"{brand}\".\n\
             - MUST NOT include competitor names.\n\
             - Consumer shopping queries only (\"{brand} <product> price\",\n\
               \"where to buy {brand} <product>\", \"{brand} <product> reviews\")."
        ),
        QueryCategory::Competitor => format!(
            "CATEGORY: competitor\n\
             - MUST include the brand \"{brand}\" and at least one competitor.\n\
             - Frame as comparisons or alternatives\n\
               (\"alternatives to {brand} <product>\", \"{brand} vs <competitor>\").\n\
             - NEVER compare competitors with each other without \"{brand}\"."
        ),
    };

    format!(
        "{base}\n{category_rules}\n\n\
         OUTPUT FORMAT: Return ONLY a JSON array of search query strings.\n\
         Generate exactly {count} queries."
    )
}

/// Answer a user query like a search-enabled assistant.
pub fn answer_prompt(query: &str, web_results: &str) -> String {
    format!(
        "You are an AI assistant answering a user's search query naturally and\n\
         conversationally.\n\
         \n\
         Below are web results retrieved for the query. Use them to form an\n\
         accurate, up-to-date answer.\n\
         \n\
         WEB RESULTS:\n{web_results}\n\
         \n\
         USER QUESTION:\n{query}\n\
         \n\
         Write a helpful, modern, natural answer that reflects the factual\n\
         information in the web results. Do not mention the phrase \"web\n\
         results\" and do not say \"based on the context\". Just answer normally\n\
         like a search-enabled AI assistant."
    )
}

/// Extract structured visibility fields from one model's answer.
pub fn extraction_prompt(raw_text: &str, brand: &str, original_query: &str) -> String {
    format!(
        "You are a STRICT JSON parser with intelligent list detection.\n\
         Use ONLY the RAW_RESPONSE text. DO NOT guess or invent any facts.\n\
         \n\
         Extract: brand_mentioned (boolean), rank (integer or null),\n\
         competitors (brand -> product list). Return exactly ONE JSON object\n\
         and nothing else.\n\
         \n\
         RANKING RULES:\n\
         1) Explicit lists take precedence: numbered lists (1., 2., 3.),\n\
            \"#1\"/\"#2\", \"Top N\", ordinals (\"ranked 2nd\"), roman numerals.\n\
         2) If the text describes multiple products as alternatives, choices,\n\
            options, recommendations, or competing products, rank by first\n\
            mention: first -> 1, second -> 2, third -> 3.\n\
         3) If the BRAND does not appear in such a list, rank = null.\n\
         \n\
         BRAND MENTION RULE: brand_mentioned MUST be true if BRAND (or its\n\
         models) appears anywhere, false otherwise. Never any other type.\n\
         \n\
         COMPETITOR EXTRACTION: a dictionary mapping competitor brand name to\n\
         a list of that brand's product models, or null if the brand appears\n\
         with no specific model. Manufacturer/company names only (never\n\
         retailers). Preserve order of first appearance. No duplicates. DO NOT\n\
         include the BRAND you are evaluating.\n\
         \n\
         ABSOLUTE NON-COMPETITOR LIST (never return these): Amazon, Flipkart,\n\
         Walmart, Target, Best Buy, eBay, AliExpress, Shopify, Newegg, Croma,\n\
         Reliance Digital, JD.com, MercadoLibre, Lazada, \"online store\",\n\
         \"retailer\", \"marketplace\", \"website\". If ONLY these appear,\n\
         competitors MUST be {{}}.\n\
         \n\
         OUTPUT FORMAT (example):\n\
         {{\"brand_mentioned\": true, \"rank\": 1,\n\
          \"competitors\": {{\"Amazfit\": [\"Amazfit Bip U Pro\"], \"Noise\": null}}}}\n\
         \n\
         RAW_RESPONSE:\n\"\"\"{raw_text}\"\"\"\n\
         \n\
         BRAND: \"{brand}\"\n\
         QUERY: \"{original_query}\""
    )
}
