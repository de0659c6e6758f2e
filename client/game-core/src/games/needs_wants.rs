use super::{GameDefinition, MiniGame};
use crate::models::commit::RewardPolicy;
use crate::models::game::Verdict;
use crate::models::RewardGrant;
use rand::rngs::StdRng;
use rand::seq::{IndexedRandom, SliceRandom};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Need,
    Want,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Item {
    pub id: u8,
    pub name: &'static str,
    pub category: Category,
}

const fn item(id: u8, name: &'static str, category: Category) -> Item {
    Item { id, name, category }
}

pub const ITEMS: [Item; 12] = [
    item(1, "Comida", Category::Need),
    item(2, "Juguete", Category::Want),
    item(3, "Agua", Category::Need),
    item(4, "Dulces", Category::Want),
    item(5, "Ropa", Category::Need),
    item(6, "Videojuego", Category::Want),
    item(7, "Medicina", Category::Need),
    item(8, "Helado", Category::Want),
    item(9, "Alquiler", Category::Need),
    item(10, "Chocolate", Category::Want),
    item(11, "Abrigo", Category::Need),
    item(12, "Teléfono nuevo", Category::Want),
];

/// Sort each item into "need" or "want".
pub struct NeedsWants {
    definition: GameDefinition,
}

impl NeedsWants {
    pub fn new() -> Self {
        Self {
            definition: GameDefinition::new("needs_wants", "Necesidades y deseos", 8, 700)
                .with_reward(RewardPolicy::Flat(RewardGrant::new(25, 60))),
        }
    }
}

impl Default for NeedsWants {
    fn default() -> Self {
        Self::new()
    }
}

impl MiniGame for NeedsWants {
    type Round = Item;
    type Choice = Category;

    fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    fn deal(&self, rng: &mut StdRng) -> Vec<Item> {
        let mut drawn: Vec<Item> = ITEMS
            .choose_multiple(rng, self.definition.rounds)
            .copied()
            .collect();
        drawn.shuffle(rng);
        drawn
    }

    fn judge(&self, round: &Item, choice: &Category) -> Verdict {
        if *choice == round.category {
            return Verdict::right();
        }
        match round.category {
            Category::Need => Verdict::wrong("Es una necesidad"),
            Category::Want => Verdict::wrong("Es un deseo"),
        }
    }
}
