use super::{Catalog, DropInfo, QuizQuestion, RewardKind, RewardTemplate};

impl Catalog {
    /// The catalog the bot ships with when no `G3MS_CATALOG_PATH` is set.
    pub fn builtin() -> Self {
        Self {
            drops: vec![space_drop(), money_drop(), ocean_drop()],
            rewards: rewards(),
        }
    }
}

fn space_drop() -> DropInfo {
    DropInfo {
        id: "solar-system".to_string(),
        title: "Tour the Solar System".to_string(),
        subject: "Science".to_string(),
        brand: Some("G3MS Space Club".to_string()),
        video_url: "https://g3ms.co/drops/solar-system/watch".to_string(),
        show_prompt: "Draw your favourite planet and send us a photo of it!".to_string(),
        questions: vec![
            QuizQuestion::new("Which planet is closest to the Sun?", ["Venus", "Mercury", "Earth", "Mars"], 1),
            QuizQuestion::new("Which planet is known as the Red Planet?", ["Jupiter", "Saturn", "Mars", "Neptune"], 2),
            QuizQuestion::new("What is the largest planet in our solar system?", ["Jupiter", "Saturn", "Uranus", "Earth"], 0),
            QuizQuestion::new("How many planets are in our solar system?", ["Seven", "Nine", "Ten", "Eight"], 3),
            QuizQuestion::new("Which planet has the most famous rings?", ["Mars", "Saturn", "Mercury", "Venus"], 1),
            QuizQuestion::new("What is at the center of our solar system?", ["The Moon", "Earth", "The Sun", "Jupiter"], 2),
            QuizQuestion::new("Which planet is the hottest?", ["Venus", "Mercury", "Mars", "Jupiter"], 0),
            QuizQuestion::new("What do we call a rock that burns up in our atmosphere?", ["Comet", "Asteroid", "Planet", "Meteor"], 3),
            QuizQuestion::new("Which planet do we live on?", ["Mars", "Earth", "Venus", "Saturn"], 1),
            QuizQuestion::new("Which planet spins on its side?", ["Neptune", "Earth", "Uranus", "Mercury"], 2),
        ],
    }
}

fn money_drop() -> DropInfo {
    DropInfo {
        id: "money-smarts".to_string(),
        title: "Money Smarts 101".to_string(),
        subject: "Financial Literacy".to_string(),
        brand: None,
        video_url: "https://g3ms.co/drops/money-smarts/watch".to_string(),
        show_prompt: "Make a weekly budget for your allowance and share a screenshot.".to_string(),
        questions: vec![
            QuizQuestion::new("What is a budget?", ["A type of bank", "A plan for spending and saving", "A credit card", "A loan"], 1),
            QuizQuestion::new("What does it mean to save money?", ["Spend it all", "Give it away", "Keep it for later", "Borrow it"], 2),
            QuizQuestion::new("What is interest on a savings account?", ["Money the bank pays you", "A fee you pay", "A tax", "A coupon"], 0),
            QuizQuestion::new("Which of these is a need?", ["Video games", "Candy", "Concert tickets", "Food"], 3),
            QuizQuestion::new("What is a want?", ["Something nice to have", "Something you need to live", "A bill", "A paycheck"], 0),
            QuizQuestion::new("What happens when you borrow money?", ["It is free", "You must pay it back", "The bank forgets", "You earn interest"], 1),
            QuizQuestion::new("What is income?", ["Money you spend", "Money you owe", "Money you earn", "Money you lose"], 2),
            QuizQuestion::new("Why is an emergency fund useful?", ["To buy toys", "To pay for surprises", "To pay taxes", "To go shopping"], 1),
            QuizQuestion::new("What is a good first step to reach a savings goal?", ["Set a target amount", "Spend more", "Ignore prices", "Borrow money"], 0),
            QuizQuestion::new("What does 'compound interest' mean?", ["Interest on a loan only", "A bank fee", "A discount", "Interest earned on interest"], 3),
        ],
    }
}

fn ocean_drop() -> DropInfo {
    DropInfo {
        id: "ocean-explorers".to_string(),
        title: "Ocean Explorers".to_string(),
        subject: "Biology".to_string(),
        brand: Some("Blue Planet Partners".to_string()),
        video_url: "https://g3ms.co/drops/ocean-explorers/watch".to_string(),
        show_prompt: "Build a mini reef out of recycled materials and show it off!".to_string(),
        questions: vec![
            QuizQuestion::new("What is the largest ocean on Earth?", ["Atlantic", "Indian", "Pacific", "Arctic"], 2),
            QuizQuestion::new("What is the largest animal in the ocean?", ["Blue whale", "Great white shark", "Giant squid", "Orca"], 0),
            QuizQuestion::new("How do fish breathe?", ["With lungs", "With gills", "Through their skin", "They don't"], 1),
            QuizQuestion::new("What are coral reefs made of?", ["Rocks", "Plants", "Sand", "Tiny animals"], 3),
            QuizQuestion::new("Why is ocean water salty?", ["Minerals from rocks", "Fish add salt", "Rain is salty", "Sunlight"], 0),
            QuizQuestion::new("Which animal has eight arms?", ["Starfish", "Jellyfish", "Octopus", "Crab"], 2),
            QuizQuestion::new("What covers most of Earth's surface?", ["Forests", "Oceans", "Deserts", "Ice"], 1),
            QuizQuestion::new("What do we call the movement of ocean water toward and away from the shore?", ["Winds", "Currents", "Waves", "Tides"], 3),
            QuizQuestion::new("Which of these is a mammal?", ["Dolphin", "Tuna", "Shark", "Seahorse"], 0),
            QuizQuestion::new("What is the deepest part of the ocean called?", ["Great Barrier Reef", "Mariana Trench", "Bermuda Triangle", "Dead Sea"], 1),
        ],
    }
}

fn rewards() -> Vec<RewardTemplate> {
    vec![
        RewardTemplate {
            kind: RewardKind::GiftCard,
            title: "$10 Gift Card".to_string(),
            image: "https://g3ms.co/rewards/gift-card.png".to_string(),
            message: "You earned a $10 gift card! Ask your teacher or parent to contact us to redeem it.".to_string(),
            contact: Some("rewards@g3ms.co".to_string()),
            amount: Some("$10".to_string()),
        },
        RewardTemplate {
            kind: RewardKind::Event,
            title: "VIP Event Pass".to_string(),
            image: "https://g3ms.co/rewards/event-pass.png".to_string(),
            message: "You unlocked a VIP pass to the next G3MS live event!".to_string(),
            contact: Some("events@g3ms.co".to_string()),
            amount: None,
        },
        RewardTemplate {
            kind: RewardKind::TokenBonus,
            title: "500 Bonus Tokens".to_string(),
            image: "https://g3ms.co/rewards/token-bonus.png".to_string(),
            message: "500 bonus tokens are on their way to your G3MS wallet!".to_string(),
            contact: None,
            amount: Some("500".to_string()),
        },
    ]
}
