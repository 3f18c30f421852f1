use async_trait::async_trait;

use crate::core::error::Result;
use crate::core::state::Language;
use crate::dialogue::intent::IntentLabel;
use crate::respond::{Narrative, ResponseContext, ResponseGenerator};


/// Deterministic bilingual narrative generator. Doubles as the fallback
/// when an external generator fails, so it must never itself fail.
pub struct TemplateResponseGenerator;

impl TemplateResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    pub fn render(context: &ResponseContext) -> Narrative {
        let lang = context.language;
        match context.intent {
            Some(IntentLabel::Greeting) => greeting(lang),
            Some(IntentLabel::Help) => help(lang),
            Some(IntentLabel::FaqInfo) => faq(lang, context.faq_topic.as_deref()),
            Some(IntentLabel::ProductInfo) => product_info(lang, context.product_count),
            Some(IntentLabel::Reset) => reset(lang),
            _ => search_results(lang, context),
        }
    }
}

impl Default for TemplateResponseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResponseGenerator for TemplateResponseGenerator {
    async fn generate(&self, context: &ResponseContext) -> Result<Narrative> {
        Ok(Self::render(context))
    }
}


/// Fixed refusal shown when the detected language is unsupported. Both
/// languages at once, since by definition the user's was neither.
pub fn refusal() -> Narrative {
    Narrative {
        intro: "Maaf, saat ini kami hanya melayani Bahasa Indonesia dan Inggris. \
                Sorry, we currently only support Indonesian and English."
            .to_string(),
        follow_up: "Silakan coba lagi. / Please try again.".to_string(),
    }
}

fn greeting(lang: Language) -> Narrative {
    match lang {
        Language::Id => Narrative {
            intro: "Halo! Selamat datang di toko furnitur kami.".to_string(),
            follow_up: "Lagi cari apa hari ini? Sofa, meja, lemari, atau yang lain?".to_string(),
        },
        Language::En => Narrative {
            intro: "Hi! Welcome to our furniture store.".to_string(),
            follow_up: "What are you looking for today? A sofa, table, wardrobe, or something else?"
                .to_string(),
        },
    }
}

fn help(lang: Language) -> Narrative {
    match lang {
        Language::Id => Narrative {
            intro: "Saya bisa bantu cari furnitur: sebutkan jenisnya, lalu tambahkan warna, \
                    bahan, atau kisaran harga."
                .to_string(),
            follow_up: "Contohnya: \"cari sofa\", lalu \"yang putih\", lalu \"di bawah 5 juta\"."
                .to_string(),
        },
        Language::En => Narrative {
            intro: "I can help you find furniture: name the type, then add a color, material, \
                    or price range."
                .to_string(),
            follow_up: "For example: \"find a sofa\", then \"white one\", then \"under 5 million\"."
                .to_string(),
        },
    }
}

fn faq(lang: Language, topic: Option<&str>) -> Narrative {
    let (intro_id, intro_en) = match topic {
        Some("location") => (
            "Toko kami ada di Jl. Kemang Raya No. 12, Jakarta Selatan.",
            "Our store is at Jl. Kemang Raya No. 12, South Jakarta.",
        ),
        Some("hours") => (
            "Kami buka setiap hari pukul 09.00-21.00 WIB.",
            "We are open every day from 9 AM to 9 PM.",
        ),
        Some("payment") => (
            "Kami menerima transfer bank, kartu kredit, dan cicilan 0% hingga 12 bulan.",
            "We accept bank transfer, credit cards, and 0% installments up to 12 months.",
        ),
        Some("delivery") => (
            "Pengiriman gratis untuk area Jabodetabek, 2-5 hari kerja.",
            "Delivery is free within the greater Jakarta area, 2-5 working days.",
        ),
        _ => (
            "Ada yang ingin ditanyakan soal toko kami?",
            "Anything you would like to know about our store?",
        ),
    };
    let (follow_id, follow_en) = match topic {
        Some("location") => (
            "Mau tahu jam bukanya juga?",
            "Would you like to know our opening hours too?",
        ),
        _ => (
            "Ada lagi yang bisa dibantu?",
            "Anything else I can help with?",
        ),
    };
    match lang {
        Language::Id => Narrative {
            intro: intro_id.to_string(),
            follow_up: follow_id.to_string(),
        },
        Language::En => Narrative {
            intro: intro_en.to_string(),
            follow_up: follow_en.to_string(),
        },
    }
}

fn product_info(lang: Language, count: usize) -> Narrative {
    match lang {
        Language::Id => Narrative {
            intro: format!("Ini detail {count} produk dari pencarian terakhir:"),
            follow_up: "Mau lanjut lihat yang lain atau saring lagi?".to_string(),
        },
        Language::En => Narrative {
            intro: format!("Here are the details of the {count} products from your last search:"),
            follow_up: "Want to keep browsing or narrow it down further?".to_string(),
        },
    }
}

fn reset(lang: Language) -> Narrative {
    match lang {
        Language::Id => Narrative {
            intro: "Oke, kita mulai dari awal. Semua filter dan pencarian sudah dihapus."
                .to_string(),
            follow_up: "Lagi cari furnitur apa sekarang?".to_string(),
        },
        Language::En => Narrative {
            intro: "Alright, starting fresh. All filters and searches have been cleared."
                .to_string(),
            follow_up: "What furniture are you looking for now?".to_string(),
        },
    }
}

fn search_results(lang: Language, context: &ResponseContext) -> Narrative {
    let query = context.search_query.as_deref().unwrap_or("");
    if context.has_products {
        match lang {
            Language::Id => Narrative {
                intro: format!(
                    "Ketemu {} pilihan untuk \"{}\":",
                    context.product_count, query
                ),
                follow_up: "Mau disaring lagi berdasarkan warna, bahan, atau harga?".to_string(),
            },
            Language::En => Narrative {
                intro: format!(
                    "Found {} options for \"{}\":",
                    context.product_count, query
                ),
                follow_up: "Want to narrow it down by color, material, or price?".to_string(),
            },
        }
    } else {
        match lang {
            Language::Id => Narrative {
                intro: format!("Maaf, belum ketemu yang cocok untuk \"{query}\"."),
                follow_up: "Coba kata lain, atau longgarkan filternya?".to_string(),
            },
            Language::En => Narrative {
                intro: format!("Sorry, nothing matched \"{query}\" yet."),
                follow_up: "Try different wording, or relax the filters?".to_string(),
            },
        }
    }
}
